pub mod event;
pub mod metric;
pub mod transaction;

pub use event::{ClientEvent, EventRequest, EventResponse, Opaque};
pub use metric::{
    ErrorPoint, LatencyKind, PerformanceSeries, ProgramMetric, ProgramShare, SeriesPoint,
    TransactionMetric,
};
pub use transaction::{InstructionRecord, MessageError, MessagePayload, Transaction, MESSAGE_TYPE_V0};

use std::ops::RangeInclusive;

use rand::Rng;

/// Day part that selects the synthetic latency bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    /// 12:00 through 18:59
    Peak,
    /// 22:00 through 06:59
    Night,
    Shoulder,
}

impl DayPart {
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            12..=18 => DayPart::Peak,
            h if h >= 22 || h <= 6 => DayPart::Night,
            _ => DayPart::Shoulder,
        }
    }

    /// Inclusive RPC latency range in milliseconds
    pub fn rpc_range(&self) -> RangeInclusive<i64> {
        match self {
            DayPart::Peak => 100..=400,
            DayPart::Night => 50..=150,
            DayPart::Shoulder => 75..=300,
        }
    }

    /// Inclusive settlement latency range in milliseconds
    pub fn solana_range(&self) -> RangeInclusive<i64> {
        match self {
            DayPart::Peak => 300..=600,
            DayPart::Night => 100..=150,
            DayPart::Shoulder => 75..=300,
        }
    }
}

/// Plausible latencies for allow-listed demo programs that have no correlated client event
#[derive(Debug, Clone)]
pub struct DemoSynthesizer {
    allow_list: Vec<String>,
}

impl DemoSynthesizer {
    pub fn new(allow_list: Vec<String>) -> Self {
        Self { allow_list }
    }

    /// Whether the transaction metadata mentions any allow-listed program
    pub fn is_demo(&self, meta: &str) -> bool {
        self.allow_list
            .iter()
            .any(|program| !program.is_empty() && meta.contains(program.as_str()))
    }

    /// `(rpc_time, solana_time)` in milliseconds, drawn independently from the hour's bands
    pub fn synthesize<R: Rng + ?Sized>(&self, hour: u32, rng: &mut R) -> (i64, i64) {
        let part = DayPart::for_hour(hour);
        (rng.gen_range(part.rpc_range()), rng.gen_range(part.solana_range()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DEMO_PROGRAM: &str = "8tfDNiaEyrV6Q1U4DEXrEigs9DoDtkugzFbybENEbCDz";

    #[test]
    fn test_day_part_boundaries() {
        assert_eq!(DayPart::for_hour(12), DayPart::Peak);
        assert_eq!(DayPart::for_hour(18), DayPart::Peak);
        assert_eq!(DayPart::for_hour(19), DayPart::Shoulder);
        assert_eq!(DayPart::for_hour(21), DayPart::Shoulder);
        assert_eq!(DayPart::for_hour(22), DayPart::Night);
        assert_eq!(DayPart::for_hour(0), DayPart::Night);
        assert_eq!(DayPart::for_hour(6), DayPart::Night);
        assert_eq!(DayPart::for_hour(7), DayPart::Shoulder);
        assert_eq!(DayPart::for_hour(11), DayPart::Shoulder);
    }

    #[test]
    fn test_synthesized_values_stay_in_band() {
        let synthesizer = DemoSynthesizer::new(vec![DEMO_PROGRAM.to_string()]);
        let mut rng = StdRng::seed_from_u64(42);

        for hour in 0..24 {
            let part = DayPart::for_hour(hour);
            for _ in 0..200 {
                let (rpc, solana) = synthesizer.synthesize(hour, &mut rng);
                assert!(part.rpc_range().contains(&rpc), "rpc {} out of band at {}h", rpc, hour);
                assert!(part.solana_range().contains(&solana), "solana {} out of band at {}h", solana, hour);
            }
        }
    }

    #[test]
    fn test_allow_list_matching() {
        let synthesizer = DemoSynthesizer::new(vec![DEMO_PROGRAM.to_string()]);
        let meta = format!(r#"{{"log_messages":["Program {} invoke [1]"]}}"#, DEMO_PROGRAM);

        assert!(synthesizer.is_demo(&meta));
        assert!(!synthesizer.is_demo(r#"{"log_messages":[]}"#));
        assert!(!DemoSynthesizer::new(vec![String::new()]).is_demo("anything"));
    }
}

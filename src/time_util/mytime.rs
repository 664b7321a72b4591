use chrono::{DateTime, Utc};

pub trait TimeProvider: Send + Sync {
    fn get_utc_time(&self) -> DateTime<Utc>;
}

#[derive(Default)]
pub struct RealTimeProvider {}

impl TimeProvider for RealTimeProvider {
    fn get_utc_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the time it was made with.
#[derive(Debug)]
pub struct DummyTimeProvider {
    utc_time: DateTime<Utc>,
}

impl DummyTimeProvider {
    pub fn new(utc_time: DateTime<Utc>) -> Self {
        Self { utc_time }
    }
}

impl TimeProvider for DummyTimeProvider {
    fn get_utc_time(&self) -> DateTime<Utc> {
        self.utc_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_util::test_utils::utc_datetime;

    #[test]
    fn dummy_time_stands_still() {
        let start = utc_datetime(2024, 1, 3, 15, 35, 32);
        let provider = DummyTimeProvider::new(start);
        assert_eq!(provider.get_utc_time(), start);
        assert_eq!(provider.get_utc_time(), start);
    }
}

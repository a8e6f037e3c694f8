/// Byte counts reported by the store while streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn new(sent: u64, total: u64) -> Self {
        Self { sent, total }
    }

    /// Progress as a percentage (0.0 to 100.0). An empty file is done as
    /// soon as it is reported.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.sent as f64 * 100.0 / self.total as f64).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(UploadProgress::new(0, 200).percent(), 0.0);
        assert_eq!(UploadProgress::new(50, 200).percent(), 25.0);
        assert_eq!(UploadProgress::new(200, 200).percent(), 100.0);
        assert!((UploadProgress::new(1, 3).percent() - 33.333).abs() < 0.001);
    }

    #[test]
    fn test_empty_and_overshoot() {
        assert_eq!(UploadProgress::new(0, 0).percent(), 100.0);
        assert_eq!(UploadProgress::new(300, 200).percent(), 100.0);
    }
}

#[derive(Clone, Debug)]
pub struct AccountConfig {
    /// Application-specific context mixed into session-key derivation. Both
    /// parties must use the same value.
    pub protocol_info: Vec<u8>,
    pub one_time_pre_key_batch_size: usize,
    pub min_one_time_pre_keys: usize,
    pub max_one_time_pre_keys: usize,
    pub spk_rotation_interval: std::time::Duration,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            protocol_info: b"Sanctum-E2E-v1".to_vec(),
            one_time_pre_key_batch_size: 100,
            min_one_time_pre_keys: 20,
            max_one_time_pre_keys: 100,
            spk_rotation_interval: std::time::Duration::from_secs(7 * 24 * 60 * 60), // 1 week
        }
    }
}

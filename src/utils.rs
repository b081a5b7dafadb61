use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};


const QID_CHARSET: &[u8] = b"0123456789abcdef";

pub type ErrorStr = &'static str;
pub type Result<T> = std::result::Result<T, ErrorStr>;
pub type ResultV = Result<()>;


pub fn generate_hex_id(length: u32) -> String {
    let mut rng = rand::thread_rng();

    (0..length).map(
        |_| {
            let idx = rng.gen_range(0..QID_CHARSET.len());
            QID_CHARSET[idx] as char
        }
    ).collect()
}


fn current_duration() -> Duration {
    // A clock set before the epoch is reported as the epoch itself.
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

pub fn time_us() -> u128 {
    current_duration().as_micros()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_id_has_requested_length_and_charset() {
        let id = generate_hex_id(8);
        assert_eq!(id.len(), 8);
        assert!(id.bytes().all(|b| QID_CHARSET.contains(&b)));
    }

    #[test]
    fn time_moves_forward() {
        let a = time_us();
        let b = time_us();
        assert!(b >= a);
    }
}

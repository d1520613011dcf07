use std::path::{Path, PathBuf};
use std::time::Duration;

use sitesync_core::config::sitesync_root;

/// Editors often emit several events per save; one sync per window.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub const DAEMON_SOCKET: &str = "daemon.sock";

pub fn socket_path(home: &Path) -> PathBuf {
    sitesync_root(home).join(DAEMON_SOCKET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_lives_next_to_config() {
        let home = Path::new("/home/writer");
        assert_eq!(
            socket_path(home),
            PathBuf::from("/home/writer/.sitesync/daemon.sock")
        );
    }
}

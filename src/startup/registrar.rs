//! Run-at-login registration capability

use crate::error::Result;
use std::path::Path;

/// Command line stored for `exe` in the autorun entry.
///
/// The path is quoted: Windows splits an unquoted value at the first space.
pub fn run_command(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}

/// Registers the application to launch at user login.
///
/// Presence of the registration is the only persisted state.
pub trait StartupRegistrar {
    /// Whether the application is currently registered
    fn is_enabled(&self) -> Result<bool>;

    /// Register (or re-register) the application
    fn enable(&self) -> Result<()>;

    /// Remove the registration. Removing a missing entry succeeds.
    fn disable(&self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::GuardError;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Registrar backed by an in-memory Run key
    #[derive(Clone, Default)]
    pub struct MemoryRegistrar {
        pub values: Arc<Mutex<HashMap<String, String>>>,
        pub read_only: bool,
    }

    impl MemoryRegistrar {
        pub const NAME: &'static str = "Speaker Sleep Guard";
        pub const PATH: &'static str = r"C:\Tools\speaker-sleep-guard.exe";
    }

    impl StartupRegistrar for MemoryRegistrar {
        fn is_enabled(&self) -> Result<bool> {
            Ok(self.values.lock().contains_key(Self::NAME))
        }

        fn enable(&self) -> Result<()> {
            if self.read_only {
                return Err(GuardError::Registration("access denied".into()));
            }
            self.values
                .lock()
                .insert(Self::NAME.to_string(), Self::PATH.to_string());
            Ok(())
        }

        fn disable(&self) -> Result<()> {
            if self.read_only {
                return Err(GuardError::Registration("access denied".into()));
            }
            self.values.lock().remove(Self::NAME);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryRegistrar;
    use super::*;

    #[test]
    fn test_enable_then_disable() {
        let registrar = MemoryRegistrar::default();
        assert!(!registrar.is_enabled().unwrap());

        registrar.enable().unwrap();
        registrar.enable().unwrap();
        assert!(registrar.is_enabled().unwrap());
        assert_eq!(
            registrar.values.lock().get(MemoryRegistrar::NAME).map(String::as_str),
            Some(MemoryRegistrar::PATH)
        );

        registrar.disable().unwrap();
        assert!(registrar.values.lock().is_empty());
    }

    #[test]
    fn test_disable_missing_entry_succeeds() {
        let registrar = MemoryRegistrar::default();
        registrar.disable().unwrap();
        assert!(!registrar.is_enabled().unwrap());
    }

    #[test]
    fn test_run_command_quotes_path_with_spaces() {
        assert_eq!(
            run_command(Path::new(r"C:\Program Files\Guard\speaker-sleep-guard.exe")),
            r#""C:\Program Files\Guard\speaker-sleep-guard.exe""#
        );
        assert_eq!(
            run_command(Path::new(r"C:\Tools\speaker-sleep-guard.exe")),
            r#""C:\Tools\speaker-sleep-guard.exe""#
        );
    }

    #[test]
    fn test_failed_enable_leaves_state() {
        let registrar = MemoryRegistrar {
            read_only: true,
            ..Default::default()
        };
        assert!(registrar.enable().is_err());
        assert!(!registrar.is_enabled().unwrap());
    }
}

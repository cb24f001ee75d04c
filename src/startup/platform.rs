//! Windows boot clock, process start time, and HKCU Run key registrar

use crate::error::{GuardError, Result};
use crate::startup::{
    run_command, system_time_from_filetime_ticks, BootTimeProvider, StartupRegistrar,
};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{ERROR_FILE_NOT_FOUND, FILETIME, WIN32_ERROR},
        System::{
            Registry::{
                RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW,
                HKEY, HKEY_CURRENT_USER, KEY_QUERY_VALUE, KEY_SET_VALUE, REG_SAM_FLAGS, REG_SZ,
            },
            SystemInformation::GetTickCount64,
            Threading::{GetCurrentProcess, GetProcessTimes},
        },
    },
};

/// Per-user autorun key
const RUN_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Run";

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn filetime_to_system_time(ft: &FILETIME) -> Option<SystemTime> {
    let ticks = (u64::from(ft.dwHighDateTime) << 32) | u64::from(ft.dwLowDateTime);
    system_time_from_filetime_ticks(ticks)
}

/// Boot clock derived from system uptime.
///
/// Boot time is `now - GetTickCount64()`, which needs no textual timestamp
/// parsing and is stable across locales.
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeBootClock;

impl BootTimeProvider for UptimeBootClock {
    fn query(&self) -> Result<SystemTime> {
        let uptime = Duration::from_millis(unsafe { GetTickCount64() });
        SystemTime::now().checked_sub(uptime).ok_or_else(|| {
            GuardError::BootQueryUnavailable(format!(
                "uptime of {}s exceeds the system clock",
                uptime.as_secs()
            ))
        })
    }
}

/// Creation time of the current process
pub fn process_start_time() -> Result<SystemTime> {
    let mut creation = FILETIME::default();
    let mut exit = FILETIME::default();
    let mut kernel = FILETIME::default();
    let mut user = FILETIME::default();

    unsafe {
        GetProcessTimes(
            GetCurrentProcess(),
            &mut creation,
            &mut exit,
            &mut kernel,
            &mut user,
        )
        .map_err(|e| GuardError::BootQueryUnavailable(format!("GetProcessTimes failed: {}", e)))?;
    }

    filetime_to_system_time(&creation).ok_or_else(|| {
        GuardError::BootQueryUnavailable("process creation time out of range".into())
    })
}

/// Open registry key closed on drop
struct RegKey(HKEY);

impl Drop for RegKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

fn registry_error(action: &str, status: WIN32_ERROR) -> GuardError {
    let cause = status
        .ok()
        .err()
        .map(|e| e.to_string())
        .unwrap_or_else(|| format!("status {}", status.0));
    GuardError::Registration(format!("{}: {}", action, cause))
}

/// Startup registration stored as a named value under
/// `HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Run`
#[derive(Debug, Clone)]
pub struct RunKeyRegistrar {
    value_name: String,
    command: String,
}

impl RunKeyRegistrar {
    /// Register `command` under `value_name`
    pub fn new(value_name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            value_name: value_name.into(),
            command: command.into(),
        }
    }

    /// Register the running executable under `value_name`
    pub fn for_current_exe(value_name: impl Into<String>) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            GuardError::Registration(format!("cannot resolve executable path: {}", e))
        })?;
        Ok(Self::new(value_name, run_command(&exe)))
    }

    /// Open the Run key, `None` if it does not exist
    fn open(&self, access: REG_SAM_FLAGS) -> Result<Option<RegKey>> {
        let subkey = to_wide(RUN_KEY);
        let mut hkey = HKEY::default();

        let status = unsafe {
            RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR(subkey.as_ptr()),
                0,
                access,
                &mut hkey,
            )
        };

        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status.is_err() {
            return Err(registry_error("open Run key", status));
        }
        Ok(Some(RegKey(hkey)))
    }
}

impl StartupRegistrar for RunKeyRegistrar {
    fn is_enabled(&self) -> Result<bool> {
        let Some(key) = self.open(KEY_QUERY_VALUE)? else {
            return Ok(false);
        };
        let name = to_wide(&self.value_name);

        let status =
            unsafe { RegQueryValueExW(key.0, PCWSTR(name.as_ptr()), None, None, None, None) };

        if status == ERROR_FILE_NOT_FOUND {
            return Ok(false);
        }
        if status.is_err() {
            return Err(registry_error("query Run value", status));
        }
        Ok(true)
    }

    fn enable(&self) -> Result<()> {
        let key = self
            .open(KEY_SET_VALUE)?
            .ok_or_else(|| GuardError::Registration("Run key does not exist".into()))?;
        let name = to_wide(&self.value_name);
        let data: Vec<u8> = to_wide(&self.command)
            .into_iter()
            .flat_map(u16::to_le_bytes)
            .collect();

        let status =
            unsafe { RegSetValueExW(key.0, PCWSTR(name.as_ptr()), 0, REG_SZ, Some(data.as_slice())) };
        if status.is_err() {
            return Err(registry_error("set Run value", status));
        }

        info!("Registered startup entry '{}' -> {}", self.value_name, self.command);
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        let Some(key) = self.open(KEY_SET_VALUE)? else {
            return Ok(());
        };
        let name = to_wide(&self.value_name);

        let status = unsafe { RegDeleteValueW(key.0, PCWSTR(name.as_ptr())) };
        if status == ERROR_FILE_NOT_FOUND {
            debug!("Startup entry '{}' already absent", self.value_name);
            return Ok(());
        }
        if status.is_err() {
            return Err(registry_error("delete Run value", status));
        }

        info!("Removed startup entry '{}'", self.value_name);
        Ok(())
    }
}

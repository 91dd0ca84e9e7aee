//! Wox process liveness.
//!
//! On Unix a signal-0 probe is sound. On Windows a dead PID can be
//! recycled, so the watcher opens a handle to the original process at
//! startup and waits on that handle with zero timeout; the PID-based
//! probe is only a fallback for when the initial open failed.

/// Handle to the Wox process the host is supervising.
pub struct ProcessWatcher {
    pid: u32,
    #[cfg(windows)]
    handle: windows_sys::Win32::Foundation::HANDLE,
}

// The raw handle is owned exclusively by the watcher task.
#[cfg(windows)]
unsafe impl Send for ProcessWatcher {}

#[cfg(unix)]
impl ProcessWatcher {
    pub fn new(pid: u32) -> Self {
        ProcessWatcher { pid }
    }

    pub fn is_alive(&self) -> bool {
        unsafe { libc::kill(self.pid as libc::pid_t, 0) == 0 }
    }

    pub fn close(&mut self) {}
}

#[cfg(windows)]
impl ProcessWatcher {
    pub fn new(pid: u32) -> Self {
        use windows_sys::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, SYNCHRONIZE,
        };

        let handle =
            unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION | SYNCHRONIZE, 0, pid) };
        ProcessWatcher { pid, handle }
    }

    pub fn is_alive(&self) -> bool {
        use windows_sys::Win32::Foundation::{CloseHandle, WAIT_OBJECT_0, WAIT_TIMEOUT};
        use windows_sys::Win32::System::Threading::{
            OpenProcess, WaitForSingleObject, PROCESS_QUERY_LIMITED_INFORMATION,
        };

        if !self.handle.is_null() {
            let wait_result = unsafe { WaitForSingleObject(self.handle, 0) };
            if wait_result == WAIT_TIMEOUT {
                return true;
            }
            if wait_result == WAIT_OBJECT_0 {
                return false;
            }
        }

        // Fallback when the startup handle could not be acquired. Subject
        // to PID reuse, but better than no probe at all.
        let probe = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, self.pid) };
        if !probe.is_null() {
            unsafe { CloseHandle(probe) };
            return true;
        }
        false
    }

    pub fn close(&mut self) {
        use windows_sys::Win32::Foundation::CloseHandle;

        if !self.handle.is_null() {
            unsafe { CloseHandle(self.handle) };
            self.handle = std::ptr::null_mut();
        }
    }
}

impl Drop for ProcessWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

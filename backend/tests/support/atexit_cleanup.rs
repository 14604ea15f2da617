//! Shared embedded PostgreSQL cluster with a process-exit shutdown hook.
//!
//! `pg-embed-setup-unpriv` leaks the shared cluster guard so the server lives
//! as long as the test binary. Under nextest every binary is its own process,
//! and a postmaster left running keeps the next binary from starting on the
//! same data directory. An `atexit` handler stops it instead.

#[cfg(unix)]
use std::ffi::CString;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
#[cfg(unix)]
use std::path::PathBuf;
#[cfg(unix)]
use std::sync::OnceLock;
#[cfg(unix)]
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

#[cfg(unix)]
use color_eyre::eyre::eyre;
#[cfg(unix)]
use pg_embedded_setup_unpriv::BootstrapError;
use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle};

const SHARED_CLUSTER_RETRIES: usize = 5;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);
const EMBEDDED_PASSWORD: &str = "academy_embedded_test";
#[cfg(unix)]
const SHARED_CLUSTER_LOCK_FILE: &str = "academy-pg-embedded-shared-cluster.lock";
#[cfg(unix)]
const SHUTDOWN_POLLS: u32 = 50;

#[cfg(unix)]
static PG_POSTMASTER_PID: AtomicI32 = AtomicI32::new(0);
#[cfg(unix)]
static PG_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
#[cfg(unix)]
static SHARED_CLUSTER_LOCK_FD: OnceLock<i32> = OnceLock::new();

/// Serialise cluster bootstrap across test binaries with an `flock` held for
/// the life of the process.
#[cfg(unix)]
fn acquire_shared_cluster_lock() -> BootstrapResult<()> {
    if SHARED_CLUSTER_LOCK_FD.get().is_some() {
        return Ok(());
    }

    let lock_path = std::env::temp_dir().join(SHARED_CLUSTER_LOCK_FILE);
    let lock_path_cstring = CString::new(lock_path.as_os_str().as_bytes()).map_err(|error| {
        BootstrapError::from(eyre!(
            "encode cluster lock path '{}': {error}",
            lock_path.display()
        ))
    })?;

    // SAFETY: `lock_path_cstring` is NUL-terminated and outlives the call.
    let fd = unsafe {
        libc::open(
            lock_path_cstring.as_ptr(),
            libc::O_CREAT | libc::O_RDWR,
            0o600,
        )
    };
    if fd < 0 {
        let error = std::io::Error::last_os_error();
        return Err(BootstrapError::from(eyre!(
            "open cluster lock '{}': {error}",
            lock_path.display()
        )));
    }

    // SAFETY: `fd` came from the successful `open` above.
    if unsafe { libc::flock(fd, libc::LOCK_EX) } != 0 {
        let error = std::io::Error::last_os_error();
        // SAFETY: `fd` is open and owned here.
        unsafe {
            libc::close(fd);
        }
        return Err(BootstrapError::from(eyre!(
            "lock '{}': {error}",
            lock_path.display()
        )));
    }

    if SHARED_CLUSTER_LOCK_FD.set(fd).is_err() {
        // SAFETY: another caller won the race; this descriptor is unused.
        unsafe {
            libc::close(fd);
        }
    }
    Ok(())
}

/// Shared cluster handle, retried a few times, with shutdown registered for
/// process exit.
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    ensure_stable_password();
    #[cfg(unix)]
    acquire_shared_cluster_lock()?;
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => {
                #[cfg(unix)]
                register_process_exit_cleanup(handle);
                return Ok(handle);
            }
            Err(error) if attempt >= SHARED_CLUSTER_RETRIES => return Err(error),
            Err(_) => {
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Pin `PG_PASSWORD` so a reused data directory keeps accepting logins.
///
/// The embedded settings generate a random password per process, but
/// `initdb` only runs when the data directory is new.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster library spawns threads, at most once
        // per process behind the shared cluster mutex.
        unsafe {
            std::env::set_var("PG_PASSWORD", EMBEDDED_PASSWORD);
        }
    }
}

#[cfg(unix)]
fn read_postmaster_pid(data_dir: &std::path::Path) -> Option<i32> {
    let dir = cap_std::fs::Dir::open_ambient_dir(data_dir, cap_std::ambient_authority()).ok()?;
    let content = dir.read_to_string("postmaster.pid").ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// SIGTERM the postmaster, then SIGKILL once five seconds pass.
///
/// Signals only when `postmaster.pid` still names the recorded process, so a
/// recycled PID is left alone.
#[cfg(unix)]
extern "C" fn stop_postgres_on_exit() {
    let stored_pid = PG_POSTMASTER_PID.load(Ordering::Relaxed);
    if stored_pid <= 0 {
        return;
    }
    let pid = match PG_DATA_DIR.get().and_then(|dir| read_postmaster_pid(dir)) {
        Some(current) if current == stored_pid => current,
        _ => return,
    };

    // SAFETY: `pid` matches the on-disk postmaster record.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        return;
    }
    for _ in 0..SHUTDOWN_POLLS {
        std::thread::sleep(Duration::from_millis(100));
        // SAFETY: signal 0 only checks that the process exists.
        if unsafe { libc::kill(pid, 0) } != 0 {
            return;
        }
    }
    // SAFETY: same validated pid; graceful shutdown ran out of time.
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
}

#[cfg(unix)]
fn register_process_exit_cleanup(handle: &ClusterHandle) {
    let data_dir = &handle.settings().data_dir;
    let Some(pid) = read_postmaster_pid(data_dir) else {
        return;
    };
    if PG_POSTMASTER_PID
        .compare_exchange(0, pid, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }
    let _ = PG_DATA_DIR.set(data_dir.clone());

    // SAFETY: `stop_postgres_on_exit` is a plain `extern "C"` fn with no
    // arguments.
    let rc = unsafe { libc::atexit(stop_postgres_on_exit) };
    if rc != 0 {
        eprintln!(
            "pg-embed: atexit registration failed (rc={rc}); postmaster {pid} may outlive the tests"
        );
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    #[cfg(unix)]
    fn data_dir_with_pid_file(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("postmaster.pid"), content).expect("write pid file");
        dir
    }

    #[cfg(unix)]
    #[rstest]
    #[case("4242\n/var/lib/pg\n5432\n", Some(4242))]
    #[case("not-a-pid\n", None)]
    #[case("", None)]
    fn postmaster_pid_is_read_from_the_first_line(
        #[case] content: &str,
        #[case] expected: Option<i32>,
    ) {
        let dir = data_dir_with_pid_file(content);
        assert_eq!(super::read_postmaster_pid(dir.path()), expected);
    }

    #[cfg(unix)]
    #[rstest]
    fn missing_pid_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(super::read_postmaster_pid(dir.path()), None);
    }

    #[rstest]
    fn configured_password_is_kept() {
        let _guard = env_lock::lock_env([("PG_PASSWORD", Some("from_ci"))]);
        super::ensure_stable_password();
        assert_eq!(std::env::var("PG_PASSWORD").as_deref(), Ok("from_ci"));
    }
}

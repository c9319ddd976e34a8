//! `-d`: detach from the controlling terminal after a successful bind.
//!
//! fork, exit the parent, start a new session, `chdir("/")`, then redirect
//! stdin/stdout/stderr to `/dev/null`. Must run after bind so startup
//! failures are still visible on the original terminal.

use std::io;

#[cfg(unix)]
pub fn daemonize() -> io::Result<()> {
    // SAFETY: fork() is called before any additional threads exist in the
    // child's view of the world that this process depends on; packetd
    // calls this synchronously, before the tokio runtime spins up worker
    // threads.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid > 0 {
        std::process::exit(0);
    }

    // SAFETY: single-threaded at this point, per the fork() contract above.
    if unsafe { libc::setsid() } == -1 {
        return Err(io::Error::last_os_error());
    }

    std::env::set_current_dir("/")?;

    // SAFETY: `/dev/null` is opened read-write and dup2'd onto the three
    // standard fds, closing the original only if it isn't one of them.
    let devnull_path = std::ffi::CString::new("/dev/null").expect("no interior nul");
    unsafe {
        let devnull = libc::open(devnull_path.as_ptr(), libc::O_RDWR);
        if devnull < 0 {
            return Err(io::Error::last_os_error());
        }
        libc::dup2(devnull, libc::STDIN_FILENO);
        libc::dup2(devnull, libc::STDOUT_FILENO);
        libc::dup2(devnull, libc::STDERR_FILENO);
        if devnull > 2 {
            libc::close(devnull);
        }
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "daemonizing is only supported on unix targets",
    ))
}

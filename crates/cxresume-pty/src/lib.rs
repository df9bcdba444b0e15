//! Pseudo-terminal launching for primer injection.
//!
//! Provides:
//! - `NativePtyInjector` - Run a program in a pty and type a payload into it
//! - Shell detection utilities

pub mod injector;
pub mod shell;

pub use injector::{Frame, NativePtyInjector, PtyError, injection_frames};
pub use shell::{UnixShell, get_shell_command, posix_shell_command, program_name, resolve_executable_path};

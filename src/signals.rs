//! Signal disposition of the interpreter and of the stages it launches.
//!
//! The interpreter ignores SIGINT and SIGQUIT so a keyboard interrupt only
//! reaches the running stages. Ignored dispositions survive `exec`, so every
//! child puts the defaults back before replacing its image. SIGPIPE is in that
//! list too: the Rust runtime ignores it, and a stage writing into a closed
//! pipe must die quietly the way it would under any other shell.

use nix::sys::signal::{signal, SigHandler, Signal};

const INTERRUPTS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];
const CHILD_DEFAULTS: [Signal; 3] = [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGPIPE];

fn set_all(signals: &[Signal], handler: SigHandler) -> nix::Result<()> {
    for &sig in signals {
        // SAFETY: SigIgn and SigDfl install no Rust handler code.
        unsafe { signal(sig, handler) }?;
    }
    Ok(())
}

pub fn ignore_interrupts() -> nix::Result<()> {
    set_all(&INTERRUPTS, SigHandler::SigIgn)
}

pub fn restore_defaults() -> nix::Result<()> {
    set_all(&CHILD_DEFAULTS, SigHandler::SigDfl)
}

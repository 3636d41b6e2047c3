//! Syscall tracing over the GDB Remote Serial Protocol.
//!
//! `gdbtrace` is the remote half of an strace-style tracer: instead of
//! ptrace-ing local processes, it connects to a remote stub (gdbserver or
//! compatible), asks it to catch syscalls, and turns the resulting stop
//! replies into callbacks on a host [`Tracer`].
//!
//! ## A brief overview
//!
//! - [`GdbClient::connect`] opens one of three endpoint forms (TCP
//!   `host:port`, a serial/FIFO path, or `|command` for a stub spawned
//!   under `/bin/sh`) and negotiates capabilities: no-ack mode,
//!   `multiprocess+`, extended mode, and `vCont`.
//! - [`GdbClient::startup_child`] / [`GdbClient::startup_attach`] put the
//!   first process under trace, via `vRun` or `vAttach` (attach prefers
//!   non-stop mode when the stub offers it).
//! - [`GdbClient::finalize_init`] enumerates the remote's threads and sends
//!   the first resume.
//! - [`GdbClient::trace`] runs one stop/resume cycle, dispatching syscall
//!   entries and returns, signals (with `qXfer:siginfo:read`), exits and
//!   terminations into the [`Tracer`], until it reports that nothing is
//!   left to trace.
//!
//! Data-plane reads (registers, target memory, remote `readlink`) live on
//! [`GdbSession`] and are available to the tracer during dispatch.
//!
//! Signal numbers on the wire use GDB's protocol-wide table; the client
//! translates them into the host's numbering per personality before they
//! reach the tracer.
//!
//! All wire traffic is logged at `trace!` level via the `log` crate.

pub mod common;
pub mod conn;

mod client;
mod error;
mod protocol;
mod tracer;

pub use client::GdbClient;
pub use client::GdbSession;
pub use client::MemRead;
pub use error::ConnectionErrorKind;
pub use error::Error;
pub use tracer::exit_status;
pub use tracer::Tracee;
pub use tracer::TraceeFlags;
pub use tracer::Tracer;

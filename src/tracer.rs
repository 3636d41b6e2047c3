//! The set of operations a host tracer needs to implement.
//!
//! The client drives the remote stub; everything it learns (syscall stops,
//! signals, exits) is handed to a [`Tracer`], which owns the tracee
//! registry, the register/syscall decoding machinery, and the per-tracee
//! output.

use bitflags::bitflags;

use crate::client::GdbSession;
use crate::common::Pid;
use crate::common::Tid;

bitflags! {
    /// Lifecycle bits on a [`Tracee`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceeFlags: u32 {
        /// The tracee is attached (always set by this client).
        const ATTACHED = 1 << 0;
        /// The tracee has not yet been seen to stop.
        const STARTUP = 1 << 1;
        /// A syscall entry has been reported and its return has not.
        /// Set and cleared by the tracer's own syscall dispatch; the client
        /// only clears it when a fresh entry arrives out of turn.
        const INSYSCALL = 1 << 2;
    }
}

/// Per-tracee record. Storage belongs to the [`Tracer`]; the client reads
/// and writes these fields as stops arrive.
#[derive(Debug)]
pub struct Tracee {
    pub pid: Pid,
    pub flags: TraceeFlags,
    /// Syscall number of the current stop.
    pub scno: u64,
    /// Personality (ABI flavor) this tracee is currently executing.
    pub pers: usize,
    /// Index of the decoded syscall-table entry for the current stop.
    pub sysent: usize,
    /// Same, for the previous stop; what a return report is printed from.
    pub prev_sysent: usize,
}

impl Tracee {
    pub fn new(pid: Pid) -> Tracee {
        Tracee {
            pid,
            flags: TraceeFlags::empty(),
            scno: 0,
            pers: 0,
            sysent: 0,
            prev_sysent: 0,
        }
    }
}

/// Build a wait(2)-style status word, as the tracer's reporting entry
/// points expect one.
pub fn exit_status(code: i32, sig: i32) -> i32 {
    (code << 8) | sig
}

/// The host tracer: tracee registry, decoding engine, and signal tables.
///
/// Registry methods must behave like a keyed map: `insert_tracee` creates a
/// fresh record (replacing any existing one for that id) and opens whatever
/// per-tracee output the host keeps; `remove_tracee` forgets the id
/// entirely. The client calls everything from a single thread.
pub trait Tracer {
    /// Look up a registered tracee.
    fn tracee_mut(&mut self, tid: Tid) -> Option<&mut Tracee>;

    /// Register `tid`, creating a fresh record and its output channel.
    fn insert_tracee(&mut self, tid: Tid) -> &mut Tracee;

    /// Forget `tid` after its exit or termination was reported.
    fn remove_tracee(&mut self, tid: Tid);

    /// The tracee whose output is currently selected, if any.
    fn current_tracee(&self) -> Option<Tid>;

    /// Select the tracee whose events are being reported.
    fn set_current_tracee(&mut self, tid: Tid);

    /// Record the pid of the process the remote spawned for us.
    fn set_spawned_child(&mut self, _pid: Pid) {}

    /// Stop suppressing output that predates the first exec.
    ///
    /// A local tracer attaches right before exec and hides everything
    /// earlier; a remote launch has no such window, so the client turns the
    /// suppression off as soon as the child exists.
    fn show_startup_output(&mut self) {}

    /// Fetch the stopped thread's registers into the host's decoding state,
    /// over `remote`'s data-plane (the stub's current thread is `tid` when
    /// this is called).
    fn fetch_regs(&mut self, remote: &mut GdbSession, tid: Tid);

    /// Decode the syscall number from the fetched registers into the
    /// tracee record. Returns true when a valid table entry was found.
    fn decode_scno(&mut self, tid: Tid) -> bool;

    /// A syscall entry or return is ready to decode (`Tracee::scno` is
    /// set). `remote` is available for argument peeking.
    fn on_syscall_stop(&mut self, remote: &mut GdbSession, tid: Tid);

    /// The tracee stopped with a signal. `siginfo` carries the remote's
    /// raw `siginfo_t` bytes when they matched the host layout; `sig` is in
    /// the target's numbering, -1 if untranslatable.
    fn on_signal_stop(
        &mut self,
        remote: &mut GdbSession,
        tid: Tid,
        siginfo: Option<&[u8]>,
        sig: i32,
    );

    /// The process exited; `status` is a wait(2)-style status word.
    fn on_exit(&mut self, tid: Tid, status: i32);

    /// The process was terminated by a signal; `status` is a wait(2)-style
    /// status word.
    fn on_termination(&mut self, tid: Tid, status: i32);

    /// Number of signals the target OS knows, one past the highest.
    fn signal_count(&self) -> u32;

    /// The host's name for a target signal number (e.g. `"SIGHUP"`), under
    /// the currently selected personality.
    fn signal_name(&self, sig: u32) -> Option<&str>;

    /// How many ABI personalities the host supports.
    fn personalities(&self) -> usize {
        1
    }

    /// The currently selected personality.
    fn personality(&self) -> usize {
        0
    }

    /// Switch the host's tables to another personality.
    fn set_personality(&mut self, _pers: usize) {}
}

//! The client proper: capability handshake, process startup, the
//! continue/stop event loop, and teardown.

mod notifications;
mod ops;
mod session;
mod signal_map;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use self::ops::MemRead;
pub use self::session::GdbSession;

use std::mem;

use log::error;
use log::info;
use log::warn;

use crate::common::Pid;
use crate::common::Tid;
use crate::error::Error;
use crate::protocol::hex;
use crate::protocol::stop_reply::StopEvent;
use crate::protocol::stop_reply::StopReply;
use crate::protocol::thread_id::ThreadId;
use crate::tracer::exit_status;
use crate::tracer::Tracer;
use crate::tracer::TraceeFlags;
use self::signal_map::SignalMap;

/// A connected remote-tracing client.
///
/// The expected calling sequence is [`connect`](GdbClient::connect), one of
/// [`startup_child`](GdbClient::startup_child) /
/// [`startup_attach`](GdbClient::startup_attach), then
/// [`finalize_init`](GdbClient::finalize_init), then
/// [`trace`](GdbClient::trace) until it returns `false`, with
/// [`detach`](GdbClient::detach) for early disconnection. Dropping the
/// client closes the transport.
pub struct GdbClient {
    session: GdbSession,
    extended: bool,
    multiprocess: bool,
    vcont: bool,
    sigmap: SignalMap,
}

impl GdbClient {
    /// Open `endpoint` and perform the capability handshake.
    ///
    /// Capabilities the remote declines are logged and degraded around; the
    /// operations that cannot work without them fail when invoked.
    pub fn connect<T: Tracer>(endpoint: &str, tracer: &mut T) -> Result<GdbClient, Error> {
        let session = GdbSession::open(endpoint)?;
        GdbClient::from_session(session, tracer)
    }

    /// Perform the capability handshake on an already-open session.
    pub fn from_session<T: Tracer>(
        mut session: GdbSession,
        tracer: &mut T,
    ) -> Result<GdbClient, Error> {
        let sigmap = SignalMap::init(tracer);

        if !session.start_noack()? {
            warn!("couldn't enable noack mode");
        }

        session.send(b"qSupported:multiprocess+")?;
        let reply = session.recv(false)?;
        let multiprocess = contains(&reply, b"multiprocess+");
        if !multiprocess {
            warn!("couldn't enable multiprocess mode");
        }

        session.send(b"!")?;
        let extended = session.recv_ok()?;
        if !extended {
            warn!("couldn't enable extended mode");
        }

        session.send(b"vCont?")?;
        let reply = session.recv(false)?;
        let vcont = reply.starts_with(b"vCont");
        if !vcont {
            warn!("remote doesn't support vCont");
        }

        Ok(GdbClient {
            session,
            extended,
            multiprocess,
            vcont,
            sigmap,
        })
    }

    /// Direct access to the session's data-plane operations.
    pub fn remote(&mut self) -> &mut GdbSession {
        &mut self.session
    }

    /// Ask the remote to spawn `argv` and register it as the first tracee.
    pub fn startup_child<T, A>(&mut self, tracer: &mut T, argv: &[A]) -> Result<(), Error>
    where
        T: Tracer,
        A: AsRef<[u8]>,
    {
        if !self.extended {
            return Err(Error::MissingCapability(
                "remote doesn't support starting processes",
            ));
        }

        let mut cmd = b"vRun".to_vec();
        for arg in argv {
            cmd.push(b';');
            cmd.extend_from_slice(&hex::encode_hex_string(arg.as_ref()));
        }
        self.session.send(&cmd)?;

        let stop = self.recv_stop()?;
        match stop.event {
            StopEvent::Trap => {}
            StopEvent::Error(_) | StopEvent::Unknown => {
                return Err(Error::CommandFailed {
                    command: "vRun",
                    reply: stop.raw_lossy(),
                })
            }
            _ => {
                return Err(Error::UnexpectedStop {
                    command: "vRun",
                    reply: stop.raw_lossy(),
                })
            }
        }
        let tid = stop.tid;
        if tid < 0 {
            return Err(Error::UnknownThread(stop.raw_lossy()));
        }

        tracer.set_spawned_child(tid);
        let tcb = tracer.insert_tracee(tid);
        tcb.flags.insert(TraceeFlags::ATTACHED | TraceeFlags::STARTUP);
        self.catch_syscalls()?;

        // a local tracer hides output until the exec; remotely the process
        // already exists, so show everything
        tracer.show_startup_output();
        Ok(())
    }

    /// Attach to a running process, preferring non-stop mode and falling
    /// back to a synchronous all-stop attach.
    pub fn startup_attach<T: Tracer>(&mut self, tracer: &mut T, pid: Pid) -> Result<(), Error> {
        if !self.extended {
            return Err(Error::MissingCapability(
                "remote doesn't support attaching to processes",
            ));
        }

        self.session.send(b"QNonStop:1")?;
        if self.session.recv_ok()? {
            self.session.set_non_stop(true);
        }

        let attach = format!("vAttach;{:x}", pid);

        /* non-stop packet order:
           client sends: vAttach;PID
           server sends: OK
           client sends: vCont;t:pPID.-1
           server sends: OK
           server sends: %Stop:T05...
           client sends: vStopped          (0 or more times)
           server sends: OK */
        let mut stop = None;
        if self.session.non_stop() {
            self.session.send(attach.as_bytes())?;
            if self.session.recv_ok()? {
                self.session
                    .send(format!("vCont;t:p{:x}.-1", pid).as_bytes())?;
                stop = Some(self.recv_stop()?);
            }
        }

        let stop = match stop {
            Some(stop) => stop,
            None => {
                // all-stop fallback: a synchronous attach with its stop reply
                self.session.send(b"QNonStop:0")?;
                if !self.session.recv_ok()? {
                    return Err(Error::CommandFailed {
                        command: "vAttach",
                        reply: String::new(),
                    });
                }
                self.session.set_non_stop(false);

                self.session.send(attach.as_bytes())?;
                let stop = self.recv_stop()?;
                match stop.event {
                    StopEvent::Trap => {}
                    StopEvent::Signal(0) => {}
                    StopEvent::Error(_) | StopEvent::Unknown => {
                        return Err(Error::CommandFailed {
                            command: "vAttach",
                            reply: stop.raw_lossy(),
                        })
                    }
                    _ => {
                        return Err(Error::UnexpectedStop {
                            command: "vAttach",
                            reply: stop.raw_lossy(),
                        })
                    }
                }
                stop
            }
        };

        let tid = stop.tid;
        if tid < 0 {
            return Err(Error::UnknownThread(stop.raw_lossy()));
        }

        // the stop is authoritative about which thread we actually got
        if tid != pid {
            tracer.remove_tracee(pid);
        }
        let tcb = tracer.insert_tracee(tid);
        tcb.flags.insert(TraceeFlags::ATTACHED | TraceeFlags::STARTUP);
        self.catch_syscalls()?;

        info!(
            "process {} attached in {} mode",
            tid,
            if self.session.non_stop() {
                "non-stop"
            } else {
                "all-stop"
            }
        );
        Ok(())
    }

    /// Enumerate the remote's threads (attach stops every thread of the
    /// process, not just the pid we named) and send the first resume.
    pub fn finalize_init<T: Tracer>(&mut self, tracer: &mut T) -> Result<(), Error> {
        self.enumerate_threads(tracer)?;
        self.resume(None)
    }

    /// Detach from `pid` and let it run free.
    pub fn detach(&mut self, pid: Pid) -> Result<(), Error> {
        if self.multiprocess {
            self.session.send(format!("D;{:x}", pid).as_bytes())?;
        } else {
            self.session.send(b"D")?;
        }

        if !self.session.recv_ok()? {
            // is it still alive?
            self.session.send(format!("T;{:x}", pid).as_bytes())?;
            if self.session.recv_ok()? {
                error!("remote failed to detach {}", pid);
            }
            // otherwise it's dead, or already detached, fine
        }
        Ok(())
    }

    /// Process one stop batch: the primary stop plus any queued syscall
    /// notifications, then resume. Returns `false` when there is nothing
    /// left to trace (the last process exited, or a resume failed).
    ///
    /// The connection should be ready for a stop reply on entry, and is
    /// left the same way when `true` is returned.
    pub fn trace<T: Tracer>(&mut self, tracer: &mut T) -> Result<bool, Error> {
        let mut inject: Option<(u8, Tid)> = None;

        let mut stop = self.recv_stop()?;
        loop {
            if stop.is_empty() {
                return Err(Error::EmptyStopReply);
            }
            match stop.event {
                StopEvent::Unknown => return Err(Error::UnknownStopReply(stop.raw_lossy())),
                // a failed resume means there are no more processes
                StopEvent::Error(_) => return Ok(false),
                _ => {}
            }

            let tid = if self.multiprocess {
                let tid = stop.tid;
                self.find_thread(tracer, tid, true)?;
                if tid >= 0 {
                    tracer.set_current_tracee(tid);
                }
                tid
            } else {
                tracer.current_tracee().unwrap_or(-1)
            };
            if tid < 0 || tracer.tracee_mut(tid).is_none() {
                return Err(Error::UnknownThread(stop.raw_lossy()));
            }

            let mut exited = false;
            match stop.event {
                StopEvent::Exited(code) => {
                    tracer.on_exit(tid, exit_status(code, 0));
                    tracer.remove_tracee(tid);
                    exited = true;
                }
                StopEvent::Terminated(sig) => {
                    let pers = tracer.tracee_mut(tid).map(|t| t.pers).unwrap_or(0);
                    tracer.on_termination(tid, exit_status(0, self.sigmap.translate(pers, sig)));
                    tracer.remove_tracee(tid);
                    exited = true;
                }
                _ => {}
            }

            if exited && !self.multiprocess {
                return Ok(false);
            }

            if !exited {
                tracer.fetch_regs(&mut self.session, tid);

                // the very first time we see this tracee stopped, prime the
                // previous-syscall slot so no bogus return gets reported
                let startup = tracer
                    .tracee_mut(tid)
                    .map_or(false, |t| t.flags.contains(TraceeFlags::STARTUP));
                if startup {
                    let decoded = tracer.decode_scno(tid);
                    if let Some(tcb) = tracer.tracee_mut(tid) {
                        tcb.flags.remove(TraceeFlags::STARTUP);
                        if decoded {
                            tcb.prev_sysent = tcb.sysent;
                        }
                    }
                }

                match stop.event {
                    StopEvent::Trap => {
                        // misc trap, nothing to do...
                    }
                    StopEvent::SyscallEntry(scno) => {
                        // If we thought we were already in a syscall --
                        // missed a return? -- skipping this report doesn't
                        // do much good. Force it to be a new entry
                        // regardless, to sync up.
                        if let Some(tcb) = tracer.tracee_mut(tid) {
                            tcb.flags.remove(TraceeFlags::INSYSCALL);
                            tcb.scno = scno;
                        }
                        tracer.on_syscall_stop(&mut self.session, tid);
                    }
                    StopEvent::SyscallReturn(scno) => {
                        // If we missed the entry, recording a return would
                        // only confuse things; report the good ones.
                        let mid_syscall = tracer
                            .tracee_mut(tid)
                            .map_or(false, |t| t.flags.contains(TraceeFlags::INSYSCALL));
                        if mid_syscall {
                            if let Some(tcb) = tracer.tracee_mut(tid) {
                                tcb.scno = scno;
                            }
                            tracer.on_syscall_stop(&mut self.session, tid);
                        }
                    }
                    StopEvent::Signal(sig) => {
                        let si = match self.session.xfer_read("siginfo", "") {
                            Ok(data) if data.len() == mem::size_of::<libc::siginfo_t>() => {
                                Some(data)
                            }
                            Ok(_) => None,
                            Err(e) if !e.is_fatal() => None,
                            Err(e) => return Err(e),
                        };

                        let pers = tracer.tracee_mut(tid).map(|t| t.pers).unwrap_or(0);
                        let target = self.sigmap.translate(pers, u32::from(sig));
                        tracer.on_signal_stop(&mut self.session, tid, si.as_deref(), target);

                        // deliver it (in protocol numbering) on resume
                        inject = Some((sig, tid));
                    }
                    _ => {}
                }
            }

            // cached out-of-order notification?
            match self.session.pop_notification() {
                Some(cached) => stop = StopReply::parse(cached),
                None => break,
            }
        }

        self.resume(inject)?;
        Ok(true)
    }

    /// Receive the next stop. In non-stop mode this skips the pending
    /// resume acknowledgment, takes the `%Stop:` notification, and drains
    /// the rest of the batch with `vStopped` into the notification queue.
    fn recv_stop(&mut self) -> Result<StopReply, Error> {
        let mut payload = self.session.recv(true)?;

        if self.session.non_stop() {
            while payload.first() != Some(&b'T') {
                payload = self.session.recv(true)?;
            }

            loop {
                self.session.send(b"vStopped")?;
                let reply = self.session.recv(true)?;
                if reply == b"OK" {
                    break;
                }
                self.session.push_notification(&reply);
            }
        }

        Ok(StopReply::parse(payload))
    }

    /// Continue everyone, optionally delivering a signal to one thread.
    fn resume(&mut self, inject: Option<(u8, Tid)>) -> Result<(), Error> {
        match inject {
            Some((sig, tid)) if self.vcont => self
                .session
                .send(format!("vCont;C{:02x}:{:x};c", sig, tid).as_bytes()),
            // without vCont only the current thread resumes; single-thread
            // fallback
            Some((sig, _)) => self.session.send(format!("C{:02x}", sig).as_bytes()),
            None if self.vcont => self.session.send(b"vCont;c"),
            None => self.session.send(b"c"),
        }
    }

    /// Ask the stub to report syscall entry and return stops for its
    /// current thread.
    fn catch_syscalls(&mut self) -> Result<(), Error> {
        self.session.send(b"QCatchSyscalls:1")?;
        if !self.session.recv_ok()? {
            warn!("couldn't enable syscall catching");
        }
        Ok(())
    }

    /// Register `tid` if it is new. `current` says the stub already has it
    /// as its current thread; otherwise `Hg` switches to it first, so the
    /// thread-scoped `QCatchSyscalls` lands on the right thread.
    fn find_thread<T: Tracer>(
        &mut self,
        tracer: &mut T,
        tid: Tid,
        current: bool,
    ) -> Result<(), Error> {
        if tid < 0 || tracer.tracee_mut(tid).is_some() {
            return Ok(());
        }

        let tcb = tracer.insert_tracee(tid);
        tcb.flags.insert(TraceeFlags::ATTACHED | TraceeFlags::STARTUP);

        let mut current = current;
        if !current {
            self.session.send(format!("Hg{:x}", tid).as_bytes())?;
            current = self.session.recv_ok()?;
            if !current {
                warn!("couldn't set remote to thread {}", tid);
            }
        }
        if current {
            self.catch_syscalls()?;
        }
        Ok(())
    }

    /// Walk the remote's thread list (`qfThreadInfo`/`qsThreadInfo`),
    /// registering every thread we haven't seen.
    fn enumerate_threads<T: Tracer>(&mut self, tracer: &mut T) -> Result<(), Error> {
        self.session.send(b"qfThreadInfo")?;
        let mut reply = self.session.recv(false)?;

        while reply.first() == Some(&b'm') {
            for id in reply[1..].split(|b| *b == b',') {
                let thread = match ThreadId::parse(id) {
                    Some(thread) => thread,
                    None => continue,
                };

                self.find_thread(tracer, thread.tid, false)?;
                if tracer.current_tracee().is_none() && tracer.tracee_mut(thread.tid).is_some() {
                    tracer.set_current_tracee(thread.tid);
                }
            }

            self.session.send(b"qsThreadInfo")?;
            reply = self.session.recv(false)?;
        }

        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

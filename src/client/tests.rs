use std::collections::HashMap;
use std::mem;

use crate::client::testing::frame;
use crate::client::testing::linux_signal_name;
use crate::client::testing::notify;
use crate::client::testing::script_wire;
use crate::client::testing::SentLog;
use crate::client::GdbClient;
use crate::client::GdbSession;
use crate::common::Pid;
use crate::common::Tid;
use crate::error::Error;
use crate::tracer::Tracee;
use crate::tracer::TraceeFlags;
use crate::tracer::Tracer;

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Regs(Tid),
    Syscall { tid: Tid, scno: u64 },
    Signal { tid: Tid, sig: i32, siginfo: bool },
    Exited { tid: Tid, status: i32 },
    Terminated { tid: Tid, status: i32 },
}

/// A host tracer that records every dispatch and keeps its registry in a
/// plain map. Its syscall handler toggles `INSYSCALL` the way a real
/// decoder does: set on entry, cleared on return.
#[derive(Default)]
struct RecordingTracer {
    tracees: HashMap<Tid, Tracee>,
    current: Option<Tid>,
    spawned_child: Option<Pid>,
    startup_output: bool,
    events: Vec<Event>,
}

impl Tracer for RecordingTracer {
    fn tracee_mut(&mut self, tid: Tid) -> Option<&mut Tracee> {
        self.tracees.get_mut(&tid)
    }

    fn insert_tracee(&mut self, tid: Tid) -> &mut Tracee {
        self.tracees.insert(tid, Tracee::new(tid));
        self.tracees.get_mut(&tid).unwrap()
    }

    fn remove_tracee(&mut self, tid: Tid) {
        self.tracees.remove(&tid);
        if self.current == Some(tid) {
            self.current = None;
        }
    }

    fn current_tracee(&self) -> Option<Tid> {
        self.current
    }

    fn set_current_tracee(&mut self, tid: Tid) {
        self.current = Some(tid);
    }

    fn set_spawned_child(&mut self, pid: Pid) {
        self.spawned_child = Some(pid);
    }

    fn show_startup_output(&mut self) {
        self.startup_output = true;
    }

    fn fetch_regs(&mut self, _remote: &mut GdbSession, tid: Tid) {
        self.events.push(Event::Regs(tid));
    }

    fn decode_scno(&mut self, _tid: Tid) -> bool {
        false
    }

    fn on_syscall_stop(&mut self, _remote: &mut GdbSession, tid: Tid) {
        let tcb = self.tracees.get_mut(&tid).unwrap();
        if tcb.flags.contains(TraceeFlags::INSYSCALL) {
            tcb.flags.remove(TraceeFlags::INSYSCALL);
        } else {
            tcb.flags.insert(TraceeFlags::INSYSCALL);
        }
        let scno = tcb.scno;
        self.events.push(Event::Syscall { tid, scno });
    }

    fn on_signal_stop(
        &mut self,
        _remote: &mut GdbSession,
        tid: Tid,
        siginfo: Option<&[u8]>,
        sig: i32,
    ) {
        self.events.push(Event::Signal {
            tid,
            sig,
            siginfo: siginfo.is_some(),
        });
    }

    fn on_exit(&mut self, tid: Tid, status: i32) {
        self.events.push(Event::Exited { tid, status });
    }

    fn on_termination(&mut self, tid: Tid, status: i32) {
        self.events.push(Event::Terminated { tid, status });
    }

    fn signal_count(&self) -> u32 {
        32
    }

    fn signal_name(&self, sig: u32) -> Option<&str> {
        linux_signal_name(sig)
    }
}

fn handshake_chunks() -> Vec<Vec<u8>> {
    vec![
        frame(b"OK"),
        frame(b"PacketSize=1000;multiprocess+"),
        frame(b"OK"),
        frame(b"vCont;c;C;s;S;t"),
    ]
}

/// A fully-negotiated client over a scripted wire; `extra` is whatever the
/// server says after the handshake.
fn connected(extra: &[Vec<u8>]) -> (GdbClient, RecordingTracer, SentLog) {
    let mut chunks = handshake_chunks();
    chunks.extend_from_slice(extra);
    let (session, log) = script_wire(&chunks);
    let mut tracer = RecordingTracer::default();
    let client = GdbClient::from_session(session, &mut tracer).unwrap();
    (client, tracer, log)
}

#[test]
fn handshake_negotiates_capabilities() {
    let (client, _tracer, log) = connected(&[]);

    assert!(!client.session.ack());
    assert!(client.multiprocess);
    assert!(client.extended);
    assert!(client.vcont);
    assert!(!client.session.non_stop());

    assert_eq!(
        log.sent(),
        vec![
            b"QStartNoAckMode".to_vec(),
            b"qSupported:multiprocess+".to_vec(),
            b"!".to_vec(),
            b"vCont?".to_vec(),
        ]
    );
}

#[test]
fn handshake_degrades_without_capabilities() {
    let chunks = vec![frame(b"OK"), frame(b""), frame(b""), frame(b"")];
    let (session, _log) = script_wire(&chunks);
    let mut tracer = RecordingTracer::default();
    let client = GdbClient::from_session(session, &mut tracer).unwrap();

    assert!(!client.multiprocess);
    assert!(!client.extended);
    assert!(!client.vcont);
}

#[test]
fn startup_child_registers_first_tracee() {
    let (mut client, mut tracer, log) =
        connected(&[frame(b"T05thread:p1234.1234;"), frame(b"OK")]);

    client.startup_child(&mut tracer, &["/bin/ls"]).unwrap();

    assert_eq!(tracer.spawned_child, Some(0x1234));
    assert!(tracer.startup_output);
    let tcb = tracer.tracees.get(&0x1234).unwrap();
    assert!(tcb.flags.contains(TraceeFlags::ATTACHED | TraceeFlags::STARTUP));

    let sent = log.sent();
    assert_eq!(sent[4], b"vRun;2f62696e2f6c73");
    assert_eq!(sent[5], b"QCatchSyscalls:1");
}

#[test]
fn startup_child_requires_extended_mode() {
    let chunks = vec![frame(b"OK"), frame(b"multiprocess+"), frame(b""), frame(b"vCont;c")];
    let (session, _log) = script_wire(&chunks);
    let mut tracer = RecordingTracer::default();
    let mut client = GdbClient::from_session(session, &mut tracer).unwrap();

    let err = client.startup_child(&mut tracer, &["/bin/ls"]).unwrap_err();
    assert!(matches!(err, Error::MissingCapability(_)));
}

#[test]
fn startup_child_rejects_non_trap_stop() {
    let (mut client, mut tracer, _log) = connected(&[frame(b"E01")]);

    let err = client.startup_child(&mut tracer, &["/bin/ls"]).unwrap_err();
    assert!(matches!(err, Error::CommandFailed { command: "vRun", .. }));
}

#[test]
fn syscall_entry_return_pair() {
    let (mut client, mut tracer, log) = connected(&[
        frame(b"T05syscall_entry:3b;thread:p1234.1234;"),
        frame(b"OK"), // QCatchSyscalls for the new thread
        frame(b"T05syscall_return:3b;thread:p1234.1234;"),
    ]);

    assert!(client.trace(&mut tracer).unwrap());
    assert!(client.trace(&mut tracer).unwrap());

    assert_eq!(
        tracer.events,
        vec![
            Event::Regs(0x1234),
            Event::Syscall { tid: 0x1234, scno: 0x3b },
            Event::Regs(0x1234),
            Event::Syscall { tid: 0x1234, scno: 0x3b },
        ]
    );

    // entry set the mid-syscall flag, return cleared it
    let tcb = tracer.tracees.get(&0x1234).unwrap();
    assert!(!tcb.flags.contains(TraceeFlags::INSYSCALL));
    assert!(!tcb.flags.contains(TraceeFlags::STARTUP));

    let sent = log.sent();
    assert_eq!(sent[sent.len() - 1], b"vCont;c");
    assert_eq!(sent[sent.len() - 2], b"vCont;c");
}

#[test]
fn syscall_return_without_entry_is_dropped() {
    let (mut client, mut tracer, _log) = connected(&[
        frame(b"T05syscall_return:3b;thread:p1234.1234;"),
        frame(b"OK"),
    ]);

    assert!(client.trace(&mut tracer).unwrap());

    // regs were fetched, but no return was reported for the missed entry
    assert_eq!(tracer.events, vec![Event::Regs(0x1234)]);
}

#[test]
fn signal_delivery_with_injection() {
    let mut siginfo = b"l".to_vec();
    siginfo.extend(std::iter::repeat(0u8).take(mem::size_of::<libc::siginfo_t>()));

    let (mut client, mut tracer, log) = connected(&[
        frame(b"T0bthread:p1234.1235;"),
        frame(b"OK"), // QCatchSyscalls for the new thread
        frame(&siginfo),
    ]);

    assert!(client.trace(&mut tracer).unwrap());

    // protocol SIGSEGV (11) translates to Linux SIGSEGV (11)
    assert_eq!(
        tracer.events,
        vec![
            Event::Regs(0x1235),
            Event::Signal { tid: 0x1235, sig: 11, siginfo: true },
        ]
    );

    let sent = log.sent();
    assert_eq!(sent[sent.len() - 2], b"qXfer:siginfo:read::0,fff");
    assert_eq!(sent[sent.len() - 1], b"vCont;C0b:1235;c");
}

#[test]
fn wrong_sized_siginfo_is_not_forwarded() {
    let (mut client, mut tracer, _log) = connected(&[
        frame(b"T0bthread:p1234.1234;"),
        frame(b"OK"),
        frame(b"l\x01\x02\x03\x04"),
    ]);

    assert!(client.trace(&mut tracer).unwrap());
    assert_eq!(
        tracer.events[1],
        Event::Signal { tid: 0x1234, sig: 11, siginfo: false }
    );
}

#[test]
fn non_stop_attach_drains_the_stop_batch() {
    let (mut client, mut tracer, log) = connected(&[
        frame(b"OK"),                     // QNonStop:1
        frame(b"OK"),                     // vAttach;1234
        frame(b"OK"),                     // vCont;t:p1234.-1
        notify(b"T05thread:p1234.1234;"), // the asynchronous stop
        frame(b"T05thread:p1234.1235;"),  // vStopped -> second thread
        frame(b"OK"),                     // vStopped -> batch done
        frame(b"OK"),                     // QCatchSyscalls:1
        frame(b"mp1234.1234,p1234.1235"), // qfThreadInfo
        frame(b"OK"),                     // Hg1235
        frame(b"OK"),                     // QCatchSyscalls:1
        frame(b"l"),                      // qsThreadInfo
    ]);

    client.startup_attach(&mut tracer, 0x1234).unwrap();
    assert!(client.session.non_stop());

    client.finalize_init(&mut tracer).unwrap();

    // every thread of the process ends up registered, nothing is left queued
    assert!(tracer.tracees.contains_key(&0x1234));
    assert!(tracer.tracees.contains_key(&0x1235));
    assert!(client.session.pop_notification().is_none());

    let sent = log.sent();
    assert!(sent.contains(&b"vAttach;1234".to_vec()));
    assert!(sent.contains(&b"vCont;t:p1234.-1".to_vec()));
    assert_eq!(sent.iter().filter(|c| c.as_slice() == b"vStopped").count(), 2);
    assert!(sent.contains(&b"Hg1235".to_vec()));
    assert_eq!(sent.last().unwrap(), &b"vCont;c".to_vec());
}

#[test]
fn attach_falls_back_to_all_stop() {
    let (mut client, mut tracer, log) = connected(&[
        frame(b""),                      // QNonStop:1 unsupported
        frame(b"OK"),                    // QNonStop:0
        frame(b"T05thread:p1234.1234;"), // synchronous vAttach stop
        frame(b"OK"),                    // QCatchSyscalls:1
    ]);

    client.startup_attach(&mut tracer, 0x1234).unwrap();

    assert!(!client.session.non_stop());
    assert!(tracer.tracees.contains_key(&0x1234));

    let sent = log.sent();
    assert!(sent.contains(&b"QNonStop:0".to_vec()));
    assert_eq!(sent.iter().filter(|c| c.as_slice() == b"vAttach;1234").count(), 1);
}

#[test]
fn attach_replaces_the_guessed_pid() {
    let (mut client, mut tracer, _log) = connected(&[
        frame(b""),
        frame(b"OK"),
        frame(b"T05thread:p1234.1250;"), // stopped thread differs from pid
        frame(b"OK"),
    ]);

    tracer.insert_tracee(0x1234);
    client.startup_attach(&mut tracer, 0x1234).unwrap();

    assert!(!tracer.tracees.contains_key(&0x1234));
    assert!(tracer.tracees.contains_key(&0x1250));
}

#[test]
fn exit_drops_tracee_and_continues_when_multiprocess() {
    let (mut client, mut tracer, log) = connected(&[frame(b"W00;process:1234")]);
    tracer.insert_tracee(0x1234);

    assert!(client.trace(&mut tracer).unwrap());

    assert_eq!(
        tracer.events,
        vec![Event::Exited { tid: 0x1234, status: 0 }]
    );
    assert!(tracer.tracees.is_empty());
    assert_eq!(log.sent().last().unwrap(), &b"vCont;c".to_vec());
}

#[test]
fn exit_ends_the_loop_without_multiprocess() {
    let chunks = vec![
        frame(b"OK"),
        frame(b"PacketSize=1000"),
        frame(b"OK"),
        frame(b"vCont;c;C;s;S;t"),
        frame(b"W2a"),
    ];
    let (session, log) = script_wire(&chunks);
    let mut tracer = RecordingTracer::default();
    let mut client = GdbClient::from_session(session, &mut tracer).unwrap();
    tracer.insert_tracee(0x1234);
    tracer.set_current_tracee(0x1234);

    assert!(!client.trace(&mut tracer).unwrap());

    assert_eq!(
        tracer.events,
        vec![Event::Exited { tid: 0x1234, status: 0x2a << 8 }]
    );
    assert!(tracer.tracees.is_empty());
    // no resume goes out once the loop is over
    assert_eq!(log.sent().last().unwrap(), &b"vCont?".to_vec());
}

#[test]
fn termination_translates_the_signal() {
    let (mut client, mut tracer, _log) = connected(&[frame(b"X09;process:1234")]);
    tracer.insert_tracee(0x1234);

    assert!(client.trace(&mut tracer).unwrap());

    // protocol SIGKILL (9) is Linux SIGKILL (9)
    assert_eq!(
        tracer.events,
        vec![Event::Terminated { tid: 0x1234, status: 9 }]
    );
    assert!(tracer.tracees.is_empty());
}

#[test]
fn removed_tracee_is_re_registered_on_its_next_stop() {
    let (mut client, mut tracer, _log) = connected(&[
        frame(b"W00;process:1234"),
        frame(b"T05thread:p1234.1234;"),
        frame(b"OK"),
    ]);
    tracer.insert_tracee(0x1234);

    assert!(client.trace(&mut tracer).unwrap());
    assert!(tracer.tracees.is_empty());

    assert!(client.trace(&mut tracer).unwrap());
    assert!(tracer.tracees.contains_key(&0x1234));
}

#[test]
fn queued_notifications_run_after_the_primary_stop() {
    // two syscall notifications sneak in ahead of the siginfo reply; the
    // loop processes the signal, then both in arrival order, then resumes
    // exactly once
    let (mut client, mut tracer, log) = connected(&[
        frame(b"T0bthread:p1234.1234;"),
        frame(b"OK"),
        frame(b"T05syscall_entry:3b;thread:p1234.1234;"),
        frame(b"T05syscall_return:3b;thread:p1234.1234;"),
        frame(b"l\x00\x00"), // wrong-sized siginfo, forwarded as none
    ]);

    assert!(client.trace(&mut tracer).unwrap());

    assert_eq!(
        tracer.events,
        vec![
            Event::Regs(0x1234),
            Event::Signal { tid: 0x1234, sig: 11, siginfo: false },
            Event::Regs(0x1234),
            Event::Syscall { tid: 0x1234, scno: 0x3b },
            Event::Regs(0x1234),
            Event::Syscall { tid: 0x1234, scno: 0x3b },
        ]
    );

    let sent = log.sent();
    let resumes: Vec<_> = sent
        .iter()
        .filter(|c| c.starts_with(b"vCont;") || c.as_slice() == b"c")
        .collect();
    assert_eq!(resumes.len(), 1);
    assert_eq!(resumes[0].as_slice(), b"vCont;C0b:1234;c");
}

#[test]
fn resume_error_ends_the_loop() {
    let (mut client, mut tracer, _log) = connected(&[frame(b"E01")]);
    assert!(!client.trace(&mut tracer).unwrap());
}

#[test]
fn unknown_stop_reply_is_fatal() {
    let (mut client, mut tracer, _log) = connected(&[frame(b"Funk")]);
    let err = client.trace(&mut tracer).unwrap_err();
    assert!(matches!(err, Error::UnknownStopReply(_)));
}

#[test]
fn resume_without_vcont_falls_back_to_c() {
    let chunks = vec![
        frame(b"OK"),
        frame(b"PacketSize=1000;multiprocess+"),
        frame(b"OK"),
        frame(b""), // no vCont
        frame(b"T05thread:p1234.1234;"),
        frame(b"OK"),
    ];
    let (session, log) = script_wire(&chunks);
    let mut tracer = RecordingTracer::default();
    let mut client = GdbClient::from_session(session, &mut tracer).unwrap();

    assert!(client.trace(&mut tracer).unwrap());
    assert_eq!(log.sent().last().unwrap(), &b"c".to_vec());
}

#[test]
fn detach_probes_liveness_on_failure() {
    let (mut client, _tracer, log) = connected(&[
        frame(b"E01"), // D;1234 failed
        frame(b""),    // T;1234 -> not alive, fine
    ]);

    client.detach(0x1234).unwrap();

    let sent = log.sent();
    assert_eq!(sent[sent.len() - 2], b"D;1234");
    assert_eq!(sent[sent.len() - 1], b"T;1234");
}

#[test]
fn detach_without_multiprocess_sends_bare_d() {
    let chunks = vec![
        frame(b"OK"),
        frame(b"PacketSize=1000"),
        frame(b"OK"),
        frame(b"vCont;c"),
        frame(b"OK"), // D
    ];
    let (session, log) = script_wire(&chunks);
    let mut tracer = RecordingTracer::default();
    let mut client = GdbClient::from_session(session, &mut tracer).unwrap();

    client.detach(0x1234).unwrap();
    assert_eq!(log.sent().last().unwrap(), &b"D".to_vec());
}

#[test]
fn deferred_notification_is_queued_by_recv() {
    // a syscall notification arrives where a command reply was expected
    let (mut session, _log) = script_wire(&[
        frame(b"T05syscall_entry:3b;thread:p1.1;"),
        frame(b"OK"),
    ]);
    let reply = session.recv(false).unwrap();
    assert_eq!(reply, b"OK");
    assert_eq!(
        session.pop_notification().as_deref(),
        Some(&b"T05syscall_entry:3b;thread:p1.1;"[..])
    );
}

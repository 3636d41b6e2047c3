use crate::common::Signal;
use crate::tracer::Tracer;

/// Per-personality translation from protocol signal numbers to the target
/// OS's numbering. Computed once at connect time, immutable afterwards.
#[derive(Debug)]
pub struct SignalMap {
    // [personality][protocol signal] -> target signal, or -1
    map: Vec<Vec<i32>>,
}

impl SignalMap {
    /// Build the full map, switching the tracer through each personality it
    /// supports and restoring the original selection afterwards.
    pub fn init<T: Tracer>(tracer: &mut T) -> SignalMap {
        let old_pers = tracer.personality();

        let mut map = Vec::with_capacity(tracer.personalities());
        for pers in 0..tracer.personalities() {
            if tracer.personality() != pers {
                tracer.set_personality(pers);
            }
            map.push(
                (0..Signal::LAST)
                    .map(|sig| map_signal(tracer, Signal(sig)))
                    .collect(),
            );
        }

        if old_pers != tracer.personality() {
            tracer.set_personality(old_pers);
        }

        SignalMap { map }
    }

    /// The target number for protocol signal `sig` under `pers`, or -1.
    pub fn translate(&self, pers: usize, sig: u32) -> i32 {
        self.map
            .get(pers)
            .and_then(|table| table.get(sig as usize))
            .copied()
            .unwrap_or(-1)
    }
}

fn map_signal<T: Tracer>(tracer: &T, sig: Signal) -> i32 {
    // the host's "SIG_0" vs. the protocol's "0" -- it's all zero
    if sig == Signal::SIGZERO {
        return 0;
    }

    // real-time signals are "special", not even fully contiguous
    if sig == Signal::SIG32 {
        return 32;
    }
    if (Signal::SIG33.0..=Signal::SIG63.0).contains(&sig.0) {
        return i32::from(sig.0 - Signal::SIG33.0) + 33;
    }
    if (Signal::SIG64.0..=Signal::SIG127.0).contains(&sig.0) {
        return i32::from(sig.0 - Signal::SIG64.0) + 64;
    }

    let name = match sig.name() {
        Some(name) => name,
        None => return -1,
    };

    // many of the other signals line up, but not all
    let n = u32::from(sig.0);
    if n < tracer.signal_count() && tracer.signal_name(n) == Some(name) {
        return n as i32;
    }

    // scan the rest for a match
    for target in 1..tracer.signal_count() {
        if target == n {
            continue;
        }
        if tracer.signal_name(target) == Some(name) {
            return target as i32;
        }
    }

    -1
}

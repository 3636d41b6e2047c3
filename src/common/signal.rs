/// Cross-platform signal numbers defined by the GDB Remote Serial Protocol.
///
/// Transcribed from <https://github.com/bminor/binutils-gdb/blob/master/include/gdb/signals.def>
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signal(pub u8);

#[rustfmt::skip]
impl Signal {
    #[doc = "Signal 0 (shouldn't be used)"] pub const SIGZERO: Self = Self(0);
    #[doc = "Trace/breakpoint trap"]        pub const SIGTRAP: Self = Self(5);

    /* The real-time block is not contiguous: SIG32 and SIG64 were grafted on
       after the fact and sit outside the SIG33..SIG63 / SIG65..SIG127 runs. */
    #[doc = "Real-time event 33"]           pub const SIG33:   Self = Self(45);
    #[doc = "Real-time event 63"]           pub const SIG63:   Self = Self(75);
    #[doc = "Real-time event 32"]           pub const SIG32:   Self = Self(77);
    #[doc = "Real-time event 64"]           pub const SIG64:   Self = Self(78);
    #[doc = "Real-time event 127"]          pub const SIG127:  Self = Self(141);

    /// One past the highest protocol signal number.
    pub const LAST: u8 = 152;
}

impl Signal {
    /// The protocol-side name of this signal (e.g. `"SIGHUP"`), used to match
    /// against the host's own signal name table. `None` for the handful of
    /// slots `signals.def` leaves unnamed and for out-of-range values.
    pub fn name(self) -> Option<&'static str> {
        NAMES.get(self.0 as usize).copied().flatten()
    }
}

impl core::fmt::Display for Signal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "signal {}", self.0),
        }
    }
}

#[rustfmt::skip]
static NAMES: [Option<&str>; Signal::LAST as usize] = [
    /* 0 */   Some("0"),
    /* 1 */   Some("SIGHUP"),     Some("SIGINT"),     Some("SIGQUIT"),    Some("SIGILL"),
    /* 5 */   Some("SIGTRAP"),    Some("SIGABRT"),    Some("SIGEMT"),     Some("SIGFPE"),
    /* 9 */   Some("SIGKILL"),    Some("SIGBUS"),     Some("SIGSEGV"),    Some("SIGSYS"),
    /* 13 */  Some("SIGPIPE"),    Some("SIGALRM"),    Some("SIGTERM"),    Some("SIGURG"),
    /* 17 */  Some("SIGSTOP"),    Some("SIGTSTP"),    Some("SIGCONT"),    Some("SIGCHLD"),
    /* 21 */  Some("SIGTTIN"),    Some("SIGTTOU"),    Some("SIGIO"),      Some("SIGXCPU"),
    /* 25 */  Some("SIGXFSZ"),    Some("SIGVTALRM"),  Some("SIGPROF"),    Some("SIGWINCH"),
    /* 29 */  Some("SIGLOST"),    Some("SIGUSR1"),    Some("SIGUSR2"),    Some("SIGPWR"),
    /* 33 */  Some("SIGPOLL"),    Some("SIGWIND"),    Some("SIGPHONE"),   Some("SIGWAITING"),
    /* 37 */  Some("SIGLWP"),     Some("SIGDANGER"),  Some("SIGGRANT"),   Some("SIGRETRACT"),
    /* 41 */  Some("SIGMSG"),     Some("SIGSOUND"),   Some("SIGSAK"),     Some("SIGPRIO"),
    /* 45 */  Some("SIG33"),      Some("SIG34"),      Some("SIG35"),      Some("SIG36"),
    /* 49 */  Some("SIG37"),      Some("SIG38"),      Some("SIG39"),      Some("SIG40"),
    /* 53 */  Some("SIG41"),      Some("SIG42"),      Some("SIG43"),      Some("SIG44"),
    /* 57 */  Some("SIG45"),      Some("SIG46"),      Some("SIG47"),      Some("SIG48"),
    /* 61 */  Some("SIG49"),      Some("SIG50"),      Some("SIG51"),      Some("SIG52"),
    /* 65 */  Some("SIG53"),      Some("SIG54"),      Some("SIG55"),      Some("SIG56"),
    /* 69 */  Some("SIG57"),      Some("SIG58"),      Some("SIG59"),      Some("SIG60"),
    /* 73 */  Some("SIG61"),      Some("SIG62"),      Some("SIG63"),      Some("SIGCANCEL"),
    /* 77 */  Some("SIG32"),      Some("SIG64"),      Some("SIG65"),      Some("SIG66"),
    /* 81 */  Some("SIG67"),      Some("SIG68"),      Some("SIG69"),      Some("SIG70"),
    /* 85 */  Some("SIG71"),      Some("SIG72"),      Some("SIG73"),      Some("SIG74"),
    /* 89 */  Some("SIG75"),      Some("SIG76"),      Some("SIG77"),      Some("SIG78"),
    /* 93 */  Some("SIG79"),      Some("SIG80"),      Some("SIG81"),      Some("SIG82"),
    /* 97 */  Some("SIG83"),      Some("SIG84"),      Some("SIG85"),      Some("SIG86"),
    /* 101 */ Some("SIG87"),      Some("SIG88"),      Some("SIG89"),      Some("SIG90"),
    /* 105 */ Some("SIG91"),      Some("SIG92"),      Some("SIG93"),      Some("SIG94"),
    /* 109 */ Some("SIG95"),      Some("SIG96"),      Some("SIG97"),      Some("SIG98"),
    /* 113 */ Some("SIG99"),      Some("SIG100"),     Some("SIG101"),     Some("SIG102"),
    /* 117 */ Some("SIG103"),     Some("SIG104"),     Some("SIG105"),     Some("SIG106"),
    /* 121 */ Some("SIG107"),     Some("SIG108"),     Some("SIG109"),     Some("SIG110"),
    /* 125 */ Some("SIG111"),     Some("SIG112"),     Some("SIG113"),     Some("SIG114"),
    /* 129 */ Some("SIG115"),     Some("SIG116"),     Some("SIG117"),     Some("SIG118"),
    /* 133 */ Some("SIG119"),     Some("SIG120"),     Some("SIG121"),     Some("SIG122"),
    /* 137 */ Some("SIG123"),     Some("SIG124"),     Some("SIG125"),     Some("SIG126"),
    /* 141 */ Some("SIG127"),
    /* 142 */ Some("SIGINFO"),
    /* 143 */ None, // unknown signal
    /* 144 */ None, // internal GDB_SIGNAL_DEFAULT
    /* 145 */ Some("EXC_BAD_ACCESS"),
    /* 146 */ Some("EXC_BAD_INSTRUCTION"),
    /* 147 */ Some("EXC_ARITHMETIC"),
    /* 148 */ Some("EXC_EMULATION"),
    /* 149 */ Some("EXC_SOFTWARE"),
    /* 150 */ Some("EXC_BREAKPOINT"),
    /* 151 */ Some("SIGLIBRT"),
];

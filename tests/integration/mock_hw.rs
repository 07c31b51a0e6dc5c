//! Mock hardware adapters for integration tests.
//!
//! [`MockIo`] records every configure/write/subscribe call so tests can
//! assert on the full pin history, delivers scripted flow pulses from a
//! background thread, and answers echo-pin reads from a scripted
//! ultrasonic trace.  [`SimClock`] is a virtual monotonic clock: sleeping
//! advances it instantly, and every pin read costs one microsecond.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tankflow::app::ports::{Bias, Clock, DigitalIo, Edge, EdgeCallback, IoError, Level, PinMode};
use tankflow::pins::PinId;

/// Virtual time charged for one `read`.
pub const READ_COST: Duration = Duration::from_micros(1);

// ── SimClock ──────────────────────────────────────────────────

#[derive(Default)]
pub struct SimClock {
    now_us: AtomicU64,
}

#[allow(dead_code)]
impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_us.fetch_add(d.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.now_us.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        std::thread::yield_now();
    }
}

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCall {
    Configure(PinId, PinMode, Bias),
    Write(PinId, Level),
    Subscribe(PinId, Edge),
    Unsubscribe(PinId),
    Release(PinId),
}

// ── Echo scripts ──────────────────────────────────────────────

/// What the echo pin does after one trigger pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// High for `width_us`, starting `ECHO_LEAD_US` after the trigger.
    Width(u64),
    StuckLow,
    StuckHigh,
}

/// Delay between the trigger falling edge and the echo rising edge.
pub const ECHO_LEAD_US: u64 = 10;

#[derive(Debug, Clone)]
pub struct EchoScript {
    trig: PinId,
    pings: Vec<Echo>,
}

#[allow(dead_code)]
impl EchoScript {
    /// The same echo on every ping.
    pub fn steady(trig: PinId, width_us: u64) -> Self {
        Self::sequence(trig, vec![Echo::Width(width_us)])
    }

    pub fn stuck_low(trig: PinId) -> Self {
        Self::sequence(trig, vec![Echo::StuckLow])
    }

    pub fn stuck_high(trig: PinId) -> Self {
        Self::sequence(trig, vec![Echo::StuckHigh])
    }

    /// One entry per ping, cycling.
    pub fn sequence(trig: PinId, pings: Vec<Echo>) -> Self {
        assert!(!pings.is_empty());
        Self { trig, pings }
    }
}

/// Echo width in microseconds that reads back as `distance_cm`
/// (to the nearest microsecond).
#[allow(dead_code)]
pub fn width_for_cm(distance_cm: f64) -> u64 {
    (distance_cm / 17_150.0 * 1e6).round() as u64
}

#[derive(Default)]
struct TrigState {
    high: bool,
    fired_at: Option<Duration>,
    fired: usize,
}

// ── MockIo ────────────────────────────────────────────────────

pub struct MockIo {
    clock: Arc<SimClock>,
    calls: Mutex<Vec<IoCall>>,
    handlers: Arc<Mutex<HashMap<PinId, EdgeCallback>>>,
    pulsers: Mutex<HashMap<PinId, JoinHandle<()>>>,
    trigs: Mutex<HashMap<PinId, TrigState>>,
    flow_pulses: HashMap<PinId, u32>,
    echoes: HashMap<PinId, EchoScript>,
    failing_configure: HashSet<PinId>,
    failing_write: HashSet<PinId>,
    failing_subscribe: HashSet<PinId>,
    panicking_subscribe: HashSet<PinId>,
}

#[allow(dead_code)]
impl MockIo {
    pub fn new(clock: Arc<SimClock>) -> Self {
        Self {
            clock,
            calls: Mutex::new(Vec::new()),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            pulsers: Mutex::new(HashMap::new()),
            trigs: Mutex::new(HashMap::new()),
            flow_pulses: HashMap::new(),
            echoes: HashMap::new(),
            failing_configure: HashSet::new(),
            failing_write: HashSet::new(),
            failing_subscribe: HashSet::new(),
            panicking_subscribe: HashSet::new(),
        }
    }

    // ── Scripting ─────────────────────────────────────────────

    /// Deliver `count` falling edges on `pin` while it is subscribed.
    pub fn with_flow_pulses(mut self, pin: PinId, count: u32) -> Self {
        self.flow_pulses.insert(pin, count);
        self
    }

    pub fn with_echo(mut self, echo: PinId, script: EchoScript) -> Self {
        self.echoes.insert(echo, script);
        self
    }

    pub fn failing_configure(mut self, pin: PinId) -> Self {
        self.failing_configure.insert(pin);
        self
    }

    pub fn failing_write(mut self, pin: PinId) -> Self {
        self.failing_write.insert(pin);
        self
    }

    pub fn failing_subscribe(mut self, pin: PinId) -> Self {
        self.failing_subscribe.insert(pin);
        self
    }

    /// Panic inside `subscribe` on `pin`, as a faulting driver would.
    pub fn panicking_subscribe(mut self, pin: PinId) -> Self {
        self.panicking_subscribe.insert(pin);
        self
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn calls(&self) -> Vec<IoCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Levels written to `pin`, in order.
    pub fn writes_to(&self, pin: PinId) -> Vec<Level> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                IoCall::Write(p, level) if p == pin => Some(level),
                _ => None,
            })
            .collect()
    }

    /// Index of the first occurrence of `call`.
    pub fn position(&self, call: IoCall) -> Option<usize> {
        self.calls().iter().position(|c| *c == call)
    }

    /// Index of the last occurrence of `call`.
    pub fn last_position(&self, call: IoCall) -> Option<usize> {
        self.calls().iter().rposition(|c| *c == call)
    }

    /// Callbacks still registered.
    pub fn live_subscriptions(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Trigger pulses fired on `trig`.
    pub fn pings(&self, trig: PinId) -> usize {
        self.trigs
            .lock()
            .unwrap()
            .get(&trig)
            .map_or(0, |t| t.fired)
    }

    // ── Internal ──────────────────────────────────────────────

    fn record(&self, call: IoCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn track_trigger(&self, pin: PinId, level: Level) {
        let mut trigs = self.trigs.lock().unwrap();
        let state = trigs.entry(pin).or_default();
        match level {
            Level::High => state.high = true,
            Level::Low => {
                if state.high {
                    state.fired_at = Some(self.clock.now());
                    state.fired += 1;
                }
                state.high = false;
            }
        }
    }

    fn echo_level(&self, script: &EchoScript, now: Duration) -> Level {
        let trigs = self.trigs.lock().unwrap();
        let Some(state) = trigs.get(&script.trig) else {
            return Level::Low;
        };
        let Some(fired_at) = state.fired_at else {
            return Level::Low;
        };
        let echo = script.pings[(state.fired - 1) % script.pings.len()];
        let since = now.saturating_sub(fired_at).as_micros() as u64;
        match echo {
            Echo::Width(width) => Level::from((ECHO_LEAD_US..ECHO_LEAD_US + width).contains(&since)),
            Echo::StuckLow => Level::Low,
            Echo::StuckHigh => Level::High,
        }
    }

    /// Drain the pin's pulser, then drop its callback.
    fn detach(&self, pin: PinId) {
        if let Some(pulser) = self.pulsers.lock().unwrap().remove(&pin) {
            pulser.join().unwrap();
        }
        self.handlers.lock().unwrap().remove(&pin);
    }
}

impl DigitalIo for MockIo {
    fn configure(&self, pin: PinId, mode: PinMode, bias: Bias) -> Result<(), IoError> {
        self.record(IoCall::Configure(pin, mode, bias));
        if self.failing_configure.contains(&pin) {
            return Err(IoError::InvalidPin);
        }
        Ok(())
    }

    fn write(&self, pin: PinId, level: Level) -> Result<(), IoError> {
        self.record(IoCall::Write(pin, level));
        if self.failing_write.contains(&pin) {
            return Err(IoError::Hardware(-1));
        }
        self.track_trigger(pin, level);
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<Level, IoError> {
        let now = self.clock.now();
        self.clock.advance(READ_COST);
        Ok(self
            .echoes
            .get(&pin)
            .map_or(Level::Low, |script| self.echo_level(script, now)))
    }

    fn subscribe(&self, pin: PinId, edge: Edge, callback: EdgeCallback) -> Result<(), IoError> {
        if self.panicking_subscribe.contains(&pin) {
            panic!("driver fault on pin {pin}");
        }
        self.record(IoCall::Subscribe(pin, edge));
        if self.failing_subscribe.contains(&pin) {
            return Err(IoError::Hardware(-2));
        }
        {
            let mut handlers = self.handlers.lock().unwrap();
            if handlers.contains_key(&pin) {
                return Err(IoError::AlreadySubscribed);
            }
            handlers.insert(pin, callback);
        }

        if let Some(&count) = self.flow_pulses.get(&pin) {
            let handlers = Arc::clone(&self.handlers);
            let pulser = std::thread::spawn(move || {
                for _ in 0..count {
                    let Some(cb) = handlers.lock().unwrap().get(&pin).cloned() else {
                        break;
                    };
                    cb();
                }
            });
            self.pulsers.lock().unwrap().insert(pin, pulser);
        }
        Ok(())
    }

    fn unsubscribe(&self, pin: PinId) -> Result<(), IoError> {
        self.record(IoCall::Unsubscribe(pin));
        self.detach(pin);
        Ok(())
    }

    fn release(&self, pin: PinId) -> Result<(), IoError> {
        self.record(IoCall::Release(pin));
        self.detach(pin);
        Ok(())
    }
}

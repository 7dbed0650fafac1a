//! Keybridge Engine
//!
//! The engine coordinates the whole interception pipeline:
//! - polls the focused context and swaps the live mapping table on change
//! - registers every configured trigger with the key tap and dispatches
//!   firings to the injector, debounced and loop-guarded
//! - owns the zoom continuity worker and the wheel tap's decision procedure
//! - exposes `start`/`stop`/`reload`/`register_hotkeys` to the host
//!
//! This crate is macOS-only by design. [`Engine`] is the primary type; all
//! other modules are crate-private implementation details.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

mod debounce;
mod deps;
mod error;
mod mapper;
mod poller;
mod registry;
mod state;
#[cfg(test)]
mod test_support;
mod zoom;

use config::{ActionKind, Documents};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use keyspec::Chord;
use mac_focus::{Resolver, WebFocus, WebFocusListener};
use mac_hook::{KeyTap, WheelTap};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub use deps::{HookApi, InjectApi};
pub use error::{Error, Result};
pub use mapper::{ActionMapper, Binding, MappingLookup};

// Timing tunables, all in one place rather than inferred per call site.
/// Context poll interval.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Per-trigger debounce window.
pub(crate) const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);
/// Grace period that keeps a zoom session alive across gaps in wheel motion.
pub(crate) const STICKY_WINDOW: Duration = Duration::from_millis(500);
/// Pause after each modifier switch during a zoom session.
pub(crate) const ZOOM_SWITCH_DELAY: Duration = Duration::from_millis(20);
/// Pause between buffer drains during a zoom session.
pub(crate) const ZOOM_DRAIN_INTERVAL: Duration = Duration::from_millis(10);
/// Idle poll while no zoom session is active.
pub(crate) const ZOOM_IDLE_POLL: Duration = Duration::from_millis(10);
/// Dispatcher receive timeout; bounds how long shutdown can lag.
const DISPATCH_RECV_TIMEOUT: Duration = Duration::from_millis(100);
/// How long `stop()` waits for worker threads to wind down.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// The orchestrator. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Engine {
    /// Loaded configuration documents.
    docs: Arc<Mutex<Documents>>,
    /// Directory `reload()` re-reads the documents from.
    config_dir: PathBuf,
    /// Port the web-focus listener binds on.
    web_port: u16,
    /// Mapping builder over the catalog and active profile.
    mapper: Arc<Mutex<ActionMapper>>,
    /// Registered key triggers and the suppression guard.
    registry: Arc<Mutex<registry::TriggerRegistry>>,
    /// Per-trigger firing gate.
    debounce: Arc<debounce::DebounceGate>,
    /// Gesture session state shared with the wheel hook.
    zoom: Arc<zoom::ZoomShared>,
    /// Injection backend.
    injector: Arc<dyn InjectApi>,
    /// Resolved context identifier, written by the poller.
    context: Arc<state::ContextCell>,
    /// Live mapping table, written by the poller.
    lookup: Arc<state::LookupCell>,
    /// Context-resolution candidates, derived from the catalog.
    candidates: Arc<state::CandidateCell>,
    /// Web-focus cell fed by the local listener.
    web: WebFocus,
    /// The key tap (owned resource; explicit start/stop).
    key_tap: Arc<KeyTap>,
    /// The wheel tap (owned resource; explicit start/stop).
    wheel_tap: Arc<WheelTap>,
    /// True when any configured trigger is a wheel gesture.
    wants_wheel: Arc<AtomicBool>,
    /// Running flag observed by the dispatcher and worker loops.
    running: Arc<AtomicBool>,
    /// Cancels the poller and web listener tasks.
    cancel: Arc<Mutex<Option<CancellationToken>>>,
    /// Dispatcher and zoom worker handles, joined on stop.
    threads: Arc<Mutex<Vec<thread::JoinHandle<()>>>>,
}

/// Build a mapper from the documents' catalog and active profile.
fn build_mapper(docs: &Documents) -> ActionMapper {
    let profile = docs
        .catalog
        .active_profile(&docs.settings)
        .cloned()
        .unwrap_or_default();
    ActionMapper::new(docs.catalog.clone(), profile)
}

impl Engine {
    /// Create an engine over real taps and a real injector.
    pub fn new(docs: Documents, config_dir: PathBuf, web_port: u16) -> Self {
        let key_tap = Arc::new(KeyTap::new());
        let hook: Arc<dyn HookApi> = Arc::new(deps::RealHookApi::new(key_tap.clone()));
        let injector: Arc<dyn InjectApi> =
            Arc::new(deps::RealInjectApi::new(synthkey::Injector::new()));
        Self::assemble(docs, config_dir, web_port, key_tap, hook, injector)
    }

    /// Test constructor with mock hook and injection backends.
    #[cfg(test)]
    fn new_for_tests(
        docs: Documents,
        hook: Arc<dyn HookApi>,
        injector: Arc<dyn InjectApi>,
    ) -> Self {
        Self::assemble(
            docs,
            PathBuf::new(),
            0,
            Arc::new(KeyTap::new()),
            hook,
            injector,
        )
    }

    fn assemble(
        docs: Documents,
        config_dir: PathBuf,
        web_port: u16,
        key_tap: Arc<KeyTap>,
        hook: Arc<dyn HookApi>,
        injector: Arc<dyn InjectApi>,
    ) -> Self {
        let mapper = build_mapper(&docs);
        let context = Arc::new(state::ContextCell::default());
        let lookup = Arc::new(state::LookupCell::default());
        let candidates = Arc::new(state::CandidateCell::default());
        candidates.replace(mapper.target_apps());
        let zoom = Arc::new(zoom::ZoomShared::new(STICKY_WINDOW));

        let wheel_tap = {
            let context = context.clone();
            let lookup = lookup.clone();
            let injector = injector.clone();
            let zoom = zoom.clone();
            Arc::new(WheelTap::new(move |ev| {
                zoom::decide_wheel(&context, &lookup, &injector, &zoom, ev.delta, Instant::now())
            }))
        };

        Self {
            docs: Arc::new(Mutex::new(docs)),
            config_dir,
            web_port,
            mapper: Arc::new(Mutex::new(mapper)),
            registry: Arc::new(Mutex::new(registry::TriggerRegistry::new(hook))),
            debounce: Arc::new(debounce::DebounceGate::new(DEBOUNCE_WINDOW)),
            zoom,
            injector,
            context,
            lookup,
            candidates,
            web: WebFocus::default(),
            key_tap,
            wheel_tap,
            wants_wheel: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(Mutex::new(None)),
            threads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register every configured trigger with the key tap.
    ///
    /// Gesture triggers have no chord to register; they route through the
    /// wheel tap, which this call arms (and, when the engine is already
    /// running, starts) if any gesture is configured.
    pub fn register_hotkeys(&self) {
        let triggers = self.mapper.lock().all_triggers();
        let mut chords = Vec::new();
        let mut gestures = 0usize;
        for (spec, kind) in &triggers {
            match kind {
                ActionKind::Gesture => gestures += 1,
                ActionKind::Key => match Chord::parse(spec) {
                    Some(c) => chords.push(c),
                    None => warn!(trigger = %spec, "unparsable_trigger_skipped"),
                },
            }
        }
        self.registry.lock().update(chords);
        self.wants_wheel.store(gestures > 0, Ordering::SeqCst);
        info!(
            keys = self.registry.lock().len(),
            gestures, "hotkeys_registered"
        );
        if gestures > 0 && self.running.load(Ordering::SeqCst) {
            self.start_wheel_tap();
        }
    }

    /// Start all loops and taps. Idempotent; must be called from within a
    /// tokio runtime. Hook installation failures disable the affected
    /// feature for the session and are logged, never propagated: raw input
    /// keeps flowing no matter what.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("engine_starting");

        if let Err(e) = self.key_tap.start() {
            warn!(error = %e, "key_tap_unavailable_key_remapping_disabled");
        }
        if self.wants_wheel.load(Ordering::SeqCst) {
            self.start_wheel_tap();
        }

        let cancel = CancellationToken::new();
        *self.cancel.lock() = Some(cancel.clone());

        let resolver = Resolver::new(self.web.clone());
        tokio::spawn(poller::run_poller(
            resolver,
            self.candidates.clone(),
            self.context.clone(),
            self.lookup.clone(),
            self.mapper.clone(),
            cancel.clone(),
        ));

        let listener = WebFocusListener::new(self.web_port, self.web.clone(), cancel);
        tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                warn!(error = %e, "web_focus_listener_unavailable");
            }
        });

        let mut threads = self.threads.lock();
        let eng = self.clone();
        let rx = self.key_tap.events();
        match thread::Builder::new()
            .name("dispatch".into())
            .spawn(move || eng.run_dispatcher(&rx))
        {
            Ok(h) => threads.push(h),
            Err(e) => warn!(error = %e, "dispatcher_thread_spawn_failed"),
        }

        let shared = self.zoom.clone();
        let injector = self.injector.clone();
        let running = self.running.clone();
        match thread::Builder::new()
            .name("zoom-worker".into())
            .spawn(move || zoom::run_zoom_worker(shared, injector, running))
        {
            Ok(h) => threads.push(h),
            Err(e) => warn!(error = %e, "zoom_worker_thread_spawn_failed"),
        }
        drop(threads);

        info!("engine_started");
    }

    fn start_wheel_tap(&self) {
        if let Err(e) = self.wheel_tap.start() {
            warn!(error = %e, "wheel_tap_unavailable_gesture_remapping_disabled");
        }
    }

    /// Unregister everything, stop both taps, and wind down all loops with
    /// bounded waits. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("engine_stopping");
        if let Some(c) = self.cancel.lock().take() {
            c.cancel();
        }
        self.registry.lock().clear();
        self.key_tap.stop();
        self.wheel_tap.stop();
        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            join_bounded(handle, STOP_JOIN_TIMEOUT);
        }
        info!("engine_stopped");
    }

    /// Re-read the configuration documents and re-register all hooks.
    /// The old state stays in effect if loading fails.
    pub fn reload(&self) -> Result<()> {
        let docs = Documents::load_from_dir(&self.config_dir)?;
        self.install_documents(docs);
        info!("configuration_reloaded");
        Ok(())
    }

    /// Switch the active preference profile and re-register.
    pub fn set_active_profile(&self, name: &str) {
        let mut docs = self.docs.lock().clone();
        docs.settings.active_profile = name.to_string();
        self.install_documents(docs);
        info!(profile = name, "active_profile_switched");
    }

    /// Install freshly built documents and invalidate all derived state.
    fn install_documents(&self, docs: Documents) {
        let mapper = build_mapper(&docs);
        self.candidates.replace(mapper.target_apps());
        *self.mapper.lock() = mapper;
        *self.docs.lock() = docs;
        // Blank the published cells; the poller rebuilds from the new
        // catalog on its next tick.
        self.lookup.replace(Arc::new(MappingLookup::new()));
        self.context.set(None);
        self.register_hotkeys();
    }

    /// Drain tap events until the engine stops.
    fn run_dispatcher(&self, rx: &Receiver<mac_hook::Event>) {
        debug!("dispatcher_started");
        while self.running.load(Ordering::Relaxed) {
            match rx.recv_timeout(DISPATCH_RECV_TIMEOUT) {
                Ok(event) if event.kind == mac_hook::EventKind::KeyDown => {
                    self.on_trigger(&event.chord.to_spec());
                }
                Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("dispatcher_stopped");
    }

    /// Handle one firing of a registered trigger.
    ///
    /// The tap already suppressed the physical event, so an inactive
    /// context (or a trigger with no binding there) re-injects the
    /// original chord rather than silently eating the keystroke.
    fn on_trigger(&self, spec: &str) {
        if !self.debounce.admit(spec, Instant::now()) {
            trace!(trigger = %spec, "debounced");
            return;
        }
        let output = if self.context.current().is_some() {
            self.lookup.snapshot().get(spec).map(|b| b.output.clone())
        } else {
            None
        };
        match output {
            Some(out) => {
                debug!(trigger = %spec, output = %out, "translating");
                self.inject_guarded(&out);
            }
            None => {
                debug!(trigger = %spec, "passing_through");
                self.inject_guarded(spec);
            }
        }
    }

    /// Inject `combo`, suppressing it at the tap for the duration when it
    /// is itself a registered trigger. The suppression brackets the
    /// injection synchronously so no other thread observes a wider gap
    /// than the injection itself.
    fn inject_guarded(&self, combo: &str) {
        let guard = Chord::parse(combo)
            .map(|c| c.to_spec())
            .filter(|spec| self.registry.lock().is_registered(spec));
        if let Some(spec) = &guard {
            self.registry.lock().suppress(spec);
        }
        self.injector.inject(combo);
        if let Some(spec) = &guard {
            self.registry.lock().unsuppress(spec);
        }
    }
}

/// Join a thread, giving up after `timeout` rather than hanging shutdown.
fn join_bounded(handle: thread::JoinHandle<()>, timeout: Duration) {
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let _ = handle.join();
        let _ = done_tx.send(());
    });
    if done_rx.recv_timeout(timeout).is_err() {
        warn!("worker_thread_did_not_stop_in_time");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockHook, MockInject};

    fn docs() -> Documents {
        let catalog = serde_json::from_str(
            r#"{
                "actions": {
                    "duplicate": { "type": "key", "figma": "ctrl+d", "photoshop": "ctrl+j" },
                    "paste_over": { "type": "key", "figma": "ctrl+j", "photoshop": "ctrl+shift+v" },
                    "zoom": { "type": "gesture", "figma": "ctrl+wheel", "photoshop": "alt+wheel" }
                },
                "profiles": {
                    "main": {
                        "settings": {
                            "duplicate": "figma",
                            "paste_over": "figma",
                            "zoom": "figma"
                        }
                    }
                }
            }"#,
        )
        .expect("catalog");
        Documents {
            catalog,
            settings: config::Settings {
                active_profile: "main".into(),
            },
        }
    }

    struct Rig {
        engine: Engine,
        hook: Arc<MockHook>,
        inject: Arc<MockInject>,
    }

    fn rig() -> Rig {
        let hook = Arc::new(MockHook::default());
        let inject = Arc::new(MockInject::default());
        inject.mirror_into(hook.clone());
        let engine = Engine::new_for_tests(docs(), hook.clone(), inject.clone());
        engine.register_hotkeys();
        Rig {
            engine,
            hook,
            inject,
        }
    }

    fn focus(engine: &Engine, context: &str) {
        let table = engine.mapper.lock().lookup_for(context);
        engine.lookup.replace(table);
        engine.context.set(Some(context.to_string()));
    }

    #[test]
    fn registers_key_triggers_only() {
        let r = rig();
        // Both key triggers registered; the gesture trigger is not a chord.
        assert_eq!(
            r.hook.registered(),
            vec!["ctrl+d".to_string(), "ctrl+j".to_string()]
        );
        assert!(r.engine.wants_wheel.load(Ordering::SeqCst));
    }

    #[test]
    fn active_context_translates() {
        let r = rig();
        focus(&r.engine, "photoshop");
        r.engine.on_trigger("ctrl+d");
        assert_eq!(r.inject.injected(), vec!["ctrl+j".to_string()]);
    }

    #[test]
    fn inactive_context_passes_the_trigger_through() {
        let r = rig();
        r.engine.on_trigger("ctrl+d");
        assert_eq!(r.inject.injected(), vec!["ctrl+d".to_string()]);
    }

    #[test]
    fn unmapped_trigger_in_active_context_passes_through() {
        let r = rig();
        focus(&r.engine, "photoshop");
        // No binding for this chord in the photoshop table.
        r.engine.on_trigger("ctrl+g");
        assert_eq!(r.inject.injected(), vec!["ctrl+g".to_string()]);
    }

    #[test]
    fn translated_output_that_is_a_trigger_is_suppressed_around_injection() {
        let r = rig();
        focus(&r.engine, "photoshop");
        // ctrl+d -> ctrl+j, and ctrl+j is itself a registered trigger.
        r.engine.on_trigger("ctrl+d");
        assert_eq!(
            r.hook.log(),
            vec![
                "suppress ctrl+j".to_string(),
                "inject ctrl+j".to_string(),
                "unsuppress ctrl+j".to_string(),
            ]
        );
        // Exactly one injection: no recursive translation.
        assert_eq!(r.inject.injected(), vec!["ctrl+j".to_string()]);
    }

    #[test]
    fn output_that_is_not_a_trigger_needs_no_guard() {
        let r = rig();
        focus(&r.engine, "photoshop");
        r.engine.on_trigger("ctrl+j");
        // paste_over: ctrl+j -> ctrl+shift+v, which is not registered.
        assert_eq!(r.hook.log(), vec!["inject ctrl+shift+v".to_string()]);
    }

    #[test]
    fn debounce_admits_one_firing_per_window() {
        let r = rig();
        focus(&r.engine, "photoshop");
        r.engine.on_trigger("ctrl+d");
        r.engine.on_trigger("ctrl+d");
        assert_eq!(r.inject.injected(), vec!["ctrl+j".to_string()]);
        // A different trigger is not affected.
        r.engine.on_trigger("ctrl+j");
        assert_eq!(r.inject.injected().len(), 2);
    }

    #[test]
    fn profile_switch_reregisters() {
        let r = rig();
        // A profile that only customizes duplicate.
        let mut docs2 = r.engine.docs.lock().clone();
        docs2.catalog.profiles.insert(
            "custom".into(),
            serde_json::from_str(r#"{ "settings": { "duplicate": "custom: f5" } }"#)
                .expect("profile"),
        );
        *r.engine.docs.lock() = docs2;
        r.engine.set_active_profile("custom");
        assert_eq!(r.hook.registered(), vec!["f5".to_string()]);
        assert_eq!(r.engine.context.current(), None);
    }
}

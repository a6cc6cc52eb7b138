use std::sync::mpsc;
use std::time::{Duration, Instant};

use engine_logging::engine_debug;
use examscan_core::{update, AppState, Msg, UnitState};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::render::Renderer;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub errors: usize,
    pub output: Vec<String>,
}

/// Drives one session: feeds `script` through `update`, executes effects and
/// renders changes until every job has finished and no message is pending.
pub fn run_session(config: &AppConfig, script: Vec<Msg>) -> SessionOutcome {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut runner = EffectRunner::new(config, msg_tx.clone());
    let mut state = AppState::with_auto_dismiss_ms(config.notification_ms);
    let mut renderer = Renderer::default();
    let mut output = Vec::new();

    for msg in script {
        let _ = msg_tx.send(msg);
    }

    let mut dispatch = |state: AppState, msg: Msg| -> AppState {
        let (mut state, effects) = update(state, msg);
        runner.run(effects);
        if state.consume_dirty() {
            for line in renderer.render(&state.view()) {
                println!("{line}");
                output.push(line);
            }
        }
        state
    };

    let mut last_tick = Instant::now();
    loop {
        match msg_rx.recv_timeout(TICK) {
            Ok(msg) => state = dispatch(state, msg),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= TICK {
            last_tick = Instant::now();
            state = dispatch(
                state,
                Msg::Tick {
                    elapsed_ms: elapsed.as_millis() as u64,
                },
            );
        }

        if is_settled(&state) {
            let mut drained = false;
            while let Ok(msg) = msg_rx.try_recv() {
                state = dispatch(state, msg);
                drained = true;
            }
            if !drained && is_settled(&state) {
                engine_debug!("Session settled");
                break;
            }
        }
    }

    SessionOutcome {
        errors: renderer.errors(),
        output,
    }
}

fn is_settled(state: &AppState) -> bool {
    state.is_idle() && !matches!(state.view().unit_state, UnitState::Initializing { .. })
}

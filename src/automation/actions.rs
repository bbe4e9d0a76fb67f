//! Fixed controller action sequences.
//!
//! Each action is a hardcoded list of steps. Waits between steps cover the
//! target application's own menu and animation latency. Sequences never
//! look at the screen while running; once started they run to completion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::Duration;

use crate::automation::input::{frame_ms, Button, InputDriver, VirtualController, DEFAULT_FPS};

/// Frame rate the target switches to while attacking.
const ATTACK_FPS: u32 = 25;
/// Frames the attack button is held.
const ATTACK_HOLD_FRAMES: u32 = 8;
/// B presses after attacking to flee.
const FLEE_PRESSES: usize = 20;
/// Menu open animation after pressing Y.
const HEAL_MENU_DELAY_MS: u64 = 500;

/// One timed step of an action sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Press the buttons together for one frame, release, wait one frame.
    Press { buttons: Vec<Button>, fps: u32 },
    /// Hold the buttons for `frames` frames, release, wait one frame.
    Hold {
        buttons: Vec<Button>,
        frames: u32,
        fps: u32,
    },
    /// Plain wait.
    Wait(u64),
}

impl Step {
    fn press(buttons: &[Button]) -> Self {
        Step::Press {
            buttons: buttons.to_vec(),
            fps: DEFAULT_FPS,
        }
    }
}

/// Named actions the automation loop can trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Attack,
    Heal,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attack => write!(f, "Attack"),
            Action::Heal => write!(f, "Heal"),
        }
    }
}

impl Action {
    /// Returns the steps making up this action.
    pub fn sequence(&self) -> Vec<Step> {
        match self {
            Action::Heal => vec![
                Step::press(&[Button::Y]),
                Step::Wait(HEAL_MENU_DELAY_MS),
                // Target self while healing
                Step::press(&[Button::L1, Button::A]),
                // Exit menu
                Step::press(&[Button::B]),
                Step::press(&[Button::B]),
            ],
            Action::Attack => {
                let mut steps = vec![Step::Hold {
                    buttons: vec![Button::A],
                    frames: ATTACK_HOLD_FRAMES,
                    fps: ATTACK_FPS,
                }];
                steps.extend((0..FLEE_PRESSES).map(|_| Step::press(&[Button::B])));
                steps
            }
        }
    }

    /// Runs the whole sequence on the controller.
    pub fn perform<D: InputDriver>(&self, controller: &mut VirtualController<D>) {
        let steps = self.sequence();
        tracing::debug!(
            "Performing {} ({} steps, ~{} ms)",
            self,
            steps.len(),
            sequence_duration_ms(&steps)
        );
        run_sequence(controller, &steps);
    }
}

/// Executes the steps in order, blocking for each step's duration.
pub fn run_sequence<D: InputDriver>(controller: &mut VirtualController<D>, steps: &[Step]) {
    for step in steps {
        match step {
            Step::Press { buttons, fps } => controller.press_with_fps(buttons, *fps),
            Step::Hold {
                buttons,
                frames,
                fps,
            } => controller.hold(buttons, *frames, *fps),
            Step::Wait(ms) => thread::sleep(Duration::from_millis(*ms)),
        }
    }
}

/// Total blocking time of a sequence in milliseconds.
pub fn sequence_duration_ms(steps: &[Step]) -> u64 {
    steps
        .iter()
        .map(|step| match step {
            Step::Press { fps, .. } => 2 * frame_ms(*fps),
            Step::Hold { frames, fps, .. } => (u64::from(*frames) + 1) * frame_ms(*fps),
            Step::Wait(ms) => *ms,
        })
        .sum()
}

//! Render state management

use super::layout::ContainerSize;
use super::request::Generation;

/// Lifecycle of a viewer instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Unmounted,
    /// Document bytes are being resolved and opened
    Loading,
    /// Layout exists, nothing has been requested yet
    LaidOut,
    /// Page renders are outstanding
    Rendering,
    /// Everything visible is painted (or failed)
    Idle,
    /// Legacy embed/iframe surface shown; no layout exists
    Presented,
}

impl Phase {
    #[must_use]
    pub fn has_layout(self) -> bool {
        matches!(self, Self::LaidOut | Self::Rendering | Self::Idle)
    }
}

/// Current render state for a viewer
#[derive(Clone, Debug, Default)]
pub struct RenderState {
    pub phase: Phase,

    /// Last container size that was laid out
    pub container: ContainerSize,

    /// Vertical scroll offset inside the viewer
    pub scroll_top: f32,

    /// Layout epoch; bumped whenever a relayout is requested
    pub generation: Generation,
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Mount(container) => {
                self.phase = Phase::Loading;
                self.container = container;
                self.scroll_top = 0.0;
                vec![Effect::LoadDocument]
            }

            Command::Loaded => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                self.relayout();
                vec![
                    Effect::Relayout,
                    Effect::ScrollToTarget,
                    Effect::RenderVisible,
                ]
            }

            Command::LegacyPresented => {
                if self.phase == Phase::Loading {
                    self.phase = Phase::Presented;
                }
                vec![]
            }

            Command::LoadFailed => {
                self.phase = Phase::Unmounted;
                vec![]
            }

            Command::SetContainer(container) => {
                if self.container == container {
                    return vec![];
                }
                self.container = container;
                if self.phase.has_layout() {
                    self.relayout();
                    vec![Effect::Relayout, Effect::RenderVisible]
                } else {
                    vec![]
                }
            }

            Command::Reconfigure { scroll_target } => {
                if !self.phase.has_layout() {
                    return vec![];
                }
                self.relayout();
                let mut effects = vec![Effect::Relayout];
                if scroll_target {
                    effects.push(Effect::ScrollToTarget);
                }
                effects.push(Effect::RenderVisible);
                effects
            }

            Command::ScrollTo(top) => {
                if !self.phase.has_layout() || (self.scroll_top - top).abs() < f32::EPSILON {
                    return vec![];
                }
                self.scroll_top = top;
                vec![Effect::RenderVisible]
            }

            Command::RendersQueued(count) => {
                if count > 0 {
                    self.phase = Phase::Rendering;
                } else if self.phase == Phase::LaidOut {
                    self.phase = Phase::Idle;
                }
                vec![]
            }

            Command::RendersSettled => {
                if self.phase == Phase::Rendering {
                    self.phase = Phase::Idle;
                }
                vec![]
            }

            Command::Unmount => {
                let was_mounted = self.phase != Phase::Unmounted;
                *self = Self {
                    generation: self.generation.next(),
                    ..Self::default()
                };
                if was_mounted {
                    vec![Effect::Teardown]
                } else {
                    vec![]
                }
            }
        }
    }

    fn relayout(&mut self) {
        self.generation = self.generation.next();
        self.phase = Phase::LaidOut;
    }
}

/// Commands that modify render state
#[derive(Clone, Debug)]
pub enum Command {
    /// Start loading a document into a container of the given size
    Mount(ContainerSize),
    /// Document opened and validated
    Loaded,
    /// Legacy embed/iframe surface produced; no layout is involved
    LegacyPresented,
    LoadFailed,
    /// Debounced container size change
    SetContainer(ContainerSize),
    /// New configuration snapshot; `scroll_target` when it carries one
    Reconfigure { scroll_target: bool },
    ScrollTo(f32),
    /// Number of render requests just issued
    RendersQueued(usize),
    /// No render work outstanding
    RendersSettled,
    Unmount,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    LoadDocument,
    /// Recompute the layout for the current generation
    Relayout,
    /// Consume the pending one-shot scroll target
    ScrollToTarget,
    /// Request renders for pages near the viewport
    RenderVisible,
    /// Stop workers and drop every surface
    Teardown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laid_out() -> RenderState {
        let mut state = RenderState::new();
        let _ = state.apply(Command::Mount(ContainerSize::new(800.0, 600.0)));
        let _ = state.apply(Command::Loaded);
        state
    }

    #[test]
    fn mount_then_load_lays_out_and_renders() {
        let mut state = RenderState::new();
        let effects = state.apply(Command::Mount(ContainerSize::new(800.0, 600.0)));
        assert_eq!(effects, vec![Effect::LoadDocument]);
        assert_eq!(state.phase, Phase::Loading);

        let effects = state.apply(Command::Loaded);
        assert_eq!(
            effects,
            vec![
                Effect::Relayout,
                Effect::ScrollToTarget,
                Effect::RenderVisible
            ]
        );
        assert_eq!(state.phase, Phase::LaidOut);
        assert_eq!(state.generation, Generation(1));
    }

    #[test]
    fn container_change_bumps_generation() {
        let mut state = laid_out();
        let effects = state.apply(Command::SetContainer(ContainerSize::new(640.0, 600.0)));
        assert_eq!(effects, vec![Effect::Relayout, Effect::RenderVisible]);
        assert_eq!(state.generation, Generation(2));

        // Same size is a no-op
        assert!(
            state
                .apply(Command::SetContainer(ContainerSize::new(640.0, 600.0)))
                .is_empty()
        );
        assert_eq!(state.generation, Generation(2));
    }

    #[test]
    fn container_change_while_loading_is_recorded_only() {
        let mut state = RenderState::new();
        let _ = state.apply(Command::Mount(ContainerSize::new(800.0, 600.0)));
        assert!(
            state
                .apply(Command::SetContainer(ContainerSize::new(500.0, 600.0)))
                .is_empty()
        );
        assert_eq!(state.container, ContainerSize::new(500.0, 600.0));
        assert_eq!(state.generation, Generation(0));
    }

    #[test]
    fn reconfigure_scrolls_only_with_target() {
        let mut state = laid_out();
        let effects = state.apply(Command::Reconfigure {
            scroll_target: false,
        });
        assert_eq!(effects, vec![Effect::Relayout, Effect::RenderVisible]);

        let effects = state.apply(Command::Reconfigure {
            scroll_target: true,
        });
        assert!(effects.contains(&Effect::ScrollToTarget));
    }

    #[test]
    fn render_phases() {
        let mut state = laid_out();
        let _ = state.apply(Command::RendersQueued(3));
        assert_eq!(state.phase, Phase::Rendering);
        let _ = state.apply(Command::RendersSettled);
        assert_eq!(state.phase, Phase::Idle);

        let _ = state.apply(Command::Reconfigure {
            scroll_target: false,
        });
        let _ = state.apply(Command::RendersQueued(0));
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn scrolling_requires_layout() {
        let mut state = RenderState::new();
        assert!(state.apply(Command::ScrollTo(100.0)).is_empty());

        let mut state = laid_out();
        assert_eq!(
            state.apply(Command::ScrollTo(100.0)),
            vec![Effect::RenderVisible]
        );
        assert_eq!(state.scroll_top, 100.0);
    }

    #[test]
    fn unmount_tears_down_once() {
        let mut state = laid_out();
        let generation = state.generation;
        assert_eq!(state.apply(Command::Unmount), vec![Effect::Teardown]);
        assert_eq!(state.phase, Phase::Unmounted);
        assert!(state.generation > generation);
        assert!(state.apply(Command::Unmount).is_empty());
    }

    #[test]
    fn legacy_presentation_has_no_layout() {
        let mut state = RenderState::new();
        let _ = state.apply(Command::Mount(ContainerSize::new(800.0, 600.0)));
        let _ = state.apply(Command::LegacyPresented);
        assert_eq!(state.phase, Phase::Presented);
        assert!(!state.phase.has_layout());
    }
}

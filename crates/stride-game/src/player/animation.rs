//! Animation tag selection
//!
//! Only the choice of tag lives here; blending belongs to whoever plays the
//! clips. Available clips are checked once when a rig is attached.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnimationBindings;
use crate::events::ControllerEvent;

use super::state::CharacterState;

/// Locomotion animation tags, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationTag {
    Slide,
    Crouch,
    Fall,
    JumpRise,
    Sprint,
    Walk,
    Idle,
}

impl AnimationTag {
    pub const ALL: [AnimationTag; 7] = [
        AnimationTag::Slide,
        AnimationTag::Crouch,
        AnimationTag::Fall,
        AnimationTag::JumpRise,
        AnimationTag::Sprint,
        AnimationTag::Walk,
        AnimationTag::Idle,
    ];
}

/// Pick the tag for a state. Pure function of the state.
pub fn select_tag(state: &CharacterState) -> AnimationTag {
    if state.is_sliding {
        AnimationTag::Slide
    } else if state.is_crouching {
        AnimationTag::Crouch
    } else if !state.is_grounded && state.vertical_velocity < 0.0 {
        AnimationTag::Fall
    } else if !state.is_grounded {
        AnimationTag::JumpRise
    } else if state.is_moving && state.is_sprinting {
        AnimationTag::Sprint
    } else if state.is_moving {
        AnimationTag::Walk
    } else {
        AnimationTag::Idle
    }
}

/// Tracks the current tag and reports changes
#[derive(Debug, Clone, Default)]
pub struct AnimationSelector {
    current: Option<AnimationTag>,
    /// Clip names the attached rig reported
    available: Option<Vec<String>>,
    resolved: HashMap<AnimationTag, String>,
}

impl AnimationSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<AnimationTag> {
        self.current
    }

    pub fn is_attached(&self) -> bool {
        self.available.is_some()
    }

    /// Record the clips a rig offers and resolve bindings against them
    pub fn attach(&mut self, available: &[&str], bindings: Option<&AnimationBindings>) {
        self.available = Some(available.iter().map(|clip| clip.to_string()).collect());
        self.rebind(bindings);
        // Re-announce the current tag with its resolved clip
        self.current = None;
    }

    /// Re-resolve bindings against the clips recorded at attach time
    pub fn rebind(&mut self, bindings: Option<&AnimationBindings>) {
        self.resolved.clear();
        let (Some(available), Some(bindings)) = (&self.available, bindings) else {
            return;
        };

        for tag in AnimationTag::ALL {
            let Some(clip) = bindings.clip(tag) else {
                continue;
            };
            if available.iter().any(|name| name == clip) {
                self.resolved.insert(tag, clip.to_string());
            } else {
                warn!(?tag, clip, "Animation clip not found on attached rig");
            }
        }
        debug!(resolved = self.resolved.len(), "Resolved animation bindings");
    }

    fn clip_for(&self, tag: AnimationTag, bindings: Option<&AnimationBindings>) -> Option<String> {
        if self.is_attached() {
            self.resolved.get(&tag).cloned()
        } else {
            bindings.and_then(|b| b.clip(tag)).map(str::to_string)
        }
    }

    /// Select a tag for `state`; returns an event only when it changed
    pub fn update(
        &mut self,
        state: &CharacterState,
        bindings: Option<&AnimationBindings>,
    ) -> Option<ControllerEvent> {
        let tag = select_tag(state);
        if self.current == Some(tag) {
            return None;
        }
        self.current = Some(tag);
        Some(ControllerEvent::AnimationChanged {
            tag,
            clip: self.clip_for(tag, bindings),
        })
    }
}

use std::f32::consts::{PI, TAU};

use bevy::prelude::*;
use strum_macros::EnumIter;

use crate::{
    pointer::{
        AvatarInteraction,
        InteractionKind,
    },
    rig::RigPart,
    scene::AvatarSystems,
};


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, Reflect)]
pub enum Gesture {
    #[default]
    Idle,
    Wave,
    Dance,
    Travel,
}

impl Gesture {
    pub fn duration(&self) -> f32 {
        match self {
            Gesture::Idle => 0.0,
            Gesture::Wave => 1.6,
            Gesture::Dance => 2.4,
            Gesture::Travel => 2.0,
        }
    }

    /// Gesture a touch on `part` triggers.
    pub fn for_part(part: RigPart) -> Self {
        match part {
            RigPart::Head | RigPart::LeftHand | RigPart::RightHand => Gesture::Wave,
            RigPart::Body => Gesture::Dance,
            RigPart::LeftFoot | RigPart::RightFoot => Gesture::Travel,
        }
    }

    pub fn interaction_kind(&self) -> Option<InteractionKind> {
        match self {
            Gesture::Idle => None,
            Gesture::Wave => Some(InteractionKind::Wave),
            Gesture::Dance => Some(InteractionKind::Dance),
            Gesture::Travel => Some(InteractionKind::Travel),
        }
    }

    /// Pose offsets `elapsed` seconds into the gesture. Zero outside its duration.
    pub fn offsets(&self, elapsed: f32) -> GestureOffsets {
        let duration = self.duration();
        if duration <= 0.0 || !(0.0..=duration).contains(&elapsed) {
            return GestureOffsets::default();
        }

        let envelope = (elapsed / duration * PI).sin();
        let t = elapsed;

        match self {
            Gesture::Idle => GestureOffsets::default(),
            Gesture::Wave => GestureOffsets {
                left_arm: Vec2::new(0.0, -2.4 + 0.35 * (t * 12.0).sin()) * envelope,
                head_pitch: -0.15 * envelope,
                ..default()
            },
            Gesture::Dance => {
                let beat = (t * 8.0).sin();
                GestureOffsets {
                    yaw: 0.5 * (t * TAU * 0.5).sin() * envelope,
                    body_roll: 0.15 * beat * envelope,
                    left_leg: 0.4 * beat * envelope,
                    right_leg: -0.4 * beat * envelope,
                    ..default()
                }
            }
            Gesture::Travel => {
                let stride = (t * 10.0).sin();
                GestureOffsets {
                    body_lift: 0.3 * (t * TAU * 2.0).sin().abs() * envelope,
                    left_leg: 0.6 * stride * envelope,
                    right_leg: -0.6 * stride * envelope,
                    left_arm: Vec2::new(-0.5 * stride * envelope, 0.0),
                    right_arm: Vec2::new(0.5 * stride * envelope, 0.0),
                    ..default()
                }
            }
        }
    }
}


/// Additive contribution of a gesture to the pose target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureOffsets {
    pub yaw: f32,
    pub head_pitch: f32,
    /// (x, z) euler offsets
    pub left_arm: Vec2,
    pub right_arm: Vec2,
    pub left_leg: f32,
    pub right_leg: f32,
    pub body_lift: f32,
    pub body_roll: f32,
}

impl GestureOffsets {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}


#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct AnimationState {
    pub gesture: Gesture,
    /// seconds since startup when the gesture began
    pub started_at: f64,
    pub part: Option<RigPart>,
    /// bumped on every start, including restarts at the same instant
    pub generation: u32,
}

impl AnimationState {
    pub fn start(&mut self, gesture: Gesture, now: f64, part: Option<RigPart>) {
        self.gesture = gesture;
        self.started_at = now;
        self.part = part;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn elapsed(&self, now: f64) -> f32 {
        (now - self.started_at).max(0.0) as f32
    }

    /// Returns to idle once the gesture has run its course. Returns `true` on that transition.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.gesture == Gesture::Idle {
            return false;
        }

        if self.elapsed(now) < self.gesture.duration() {
            return false;
        }

        *self = Self {
            generation: self.generation,
            ..default()
        };
        true
    }

    pub fn offsets(&self, now: f64) -> GestureOffsets {
        self.gesture.offsets(self.elapsed(now))
    }
}


pub struct AvatarGesturePlugin;

impl Plugin for AvatarGesturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AnimationState>();
        app.register_type::<AnimationState>();

        app.add_systems(
            Update,
            (start_gestures, announce_gestures, finish_gestures)
                .chain()
                .in_set(AvatarSystems::Gesture),
        );
    }
}


pub fn start_gestures(
    mut interactions: EventReader<AvatarInteraction>,
    time: Res<Time>,
    mut state: ResMut<AnimationState>,
) {
    let now = time.elapsed_secs_f64();

    for interaction in interactions.read() {
        let (InteractionKind::Touch, Some(part)) = (interaction.kind, interaction.part) else {
            continue;
        };

        state.start(Gesture::for_part(part), now, Some(part));
    }
}

/// Emits one interaction per started gesture.
pub fn announce_gestures(
    state: Res<AnimationState>,
    mut announced: Local<Option<u32>>,
    mut interactions: EventWriter<AvatarInteraction>,
) {
    let Some(kind) = state.gesture.interaction_kind() else {
        return;
    };

    if *announced == Some(state.generation) {
        return;
    }
    *announced = Some(state.generation);

    debug!("gesture {:?} started", state.gesture);
    interactions.write(AvatarInteraction {
        kind,
        part: state.part,
        message: None,
    });
}

pub fn finish_gestures(
    time: Res<Time>,
    mut state: ResMut<AnimationState>,
) {
    let gesture = state.gesture;
    if state.tick(time.elapsed_secs_f64()) {
        debug!("gesture {gesture:?} finished");
    }
}

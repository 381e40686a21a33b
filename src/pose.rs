use bevy::prelude::*;
use bevy_args::{
    Deserialize,
    Serialize,
    ValueEnum,
};
use strum_macros::EnumIter;

use crate::{
    gesture::{
        AnimationState,
        GestureOffsets,
    },
    pointer::PointerState,
    rig::{
        AvatarRig,
        LimbKind,
        LimbSide,
    },
    scene::AvatarSystems,
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Deserialize,
    Serialize,
    ValueEnum,
    EnumIter,
)]
pub enum Page {
    #[default]
    Home,
    Schools,
    Process,
    Packages,
    News,
    About,
}

/// Host-owned page and chat state, read every frame.
#[derive(Resource, Clone, Debug, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct ViewContext {
    pub page: Page,
    pub chat_open: bool,
}


#[derive(Resource, Clone, Debug, Reflect)]
#[reflect(Resource)]
pub struct AvatarPoseSettings {
    pub home_offset: f32,
    pub home_chat_offset: f32,
    pub page_offset: f32,
    pub offset_factor: f32,
    pub follow_factor: f32,
    /// radians per second
    pub bob_frequency: f32,
    pub bob_amplitude: f32,
    /// head rotation per unit of cursor ndc
    pub head_follow: f32,
}

impl Default for AvatarPoseSettings {
    fn default() -> Self {
        Self {
            home_offset: 0.0,
            home_chat_offset: -2.0,
            page_offset: -2.8,
            offset_factor: 0.08,
            follow_factor: 0.1,
            bob_frequency: 1.0,
            bob_amplitude: 0.1,
            head_follow: 0.5,
        }
    }
}

impl AvatarPoseSettings {
    pub fn offset_for(&self, view: &ViewContext) -> f32 {
        match (view.page, view.chat_open) {
            (Page::Home, true) => self.home_chat_offset,
            (Page::Home, false) => self.home_offset,
            _ => self.page_offset,
        }
    }
}


/// One step of exponential smoothing. Never overshoots and snaps once the step
/// no longer changes the value.
pub fn damp(current: f32, target: f32, factor: f32) -> f32 {
    let factor = factor.clamp(f32::EPSILON, 1.0);
    let next = current + (target - current) * factor;

    if next == current {
        return target;
    }

    // rounding can push the step past the target
    if (target - next).signum() != (target - current).signum() {
        return target;
    }

    next
}


/// The scalar pose of the avatar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct Pose {
    pub offset_x: f32,
    pub yaw: f32,
    pub head_pitch: f32,
    pub head_yaw: f32,
    /// (x, z) euler rotation
    pub right_arm: Vec2,
    pub left_arm: Vec2,
    pub left_leg: f32,
    pub right_leg: f32,
    pub body_lift: f32,
    pub body_roll: f32,
}

impl Pose {
    pub fn target(
        view: &ViewContext,
        pointer: &PointerState,
        gesture: GestureOffsets,
        time: f32,
        settings: &AvatarPoseSettings,
    ) -> Self {
        let ndc = pointer.ndc.clamp(Vec2::NEG_ONE, Vec2::ONE);

        let right_arm = if view.page == Page::Home {
            Vec2::new(0.8, 1.8)
        } else {
            Vec2::new(0.0, 0.1 + (time * 1.5).sin() * 0.05)
        };

        Self {
            offset_x: settings.offset_for(view),
            yaw: pointer.target_yaw + gesture.yaw,
            head_pitch: ndc.y * settings.head_follow + gesture.head_pitch,
            head_yaw: ndc.x * settings.head_follow,
            right_arm: right_arm + gesture.right_arm,
            left_arm: gesture.left_arm,
            left_leg: gesture.left_leg,
            right_leg: gesture.right_leg,
            body_lift: gesture.body_lift,
            body_roll: gesture.body_roll,
        }
    }

    pub fn damp_toward(&mut self, target: &Pose, settings: &AvatarPoseSettings) {
        let f = settings.follow_factor;
        let d2 = |c: Vec2, t: Vec2| Vec2::new(damp(c.x, t.x, f), damp(c.y, t.y, f));

        self.offset_x = damp(self.offset_x, target.offset_x, settings.offset_factor);
        self.yaw = damp(self.yaw, target.yaw, f);
        self.head_pitch = damp(self.head_pitch, target.head_pitch, f);
        self.head_yaw = damp(self.head_yaw, target.head_yaw, f);
        self.right_arm = d2(self.right_arm, target.right_arm);
        self.left_arm = d2(self.left_arm, target.left_arm);
        self.left_leg = damp(self.left_leg, target.left_leg, f);
        self.right_leg = damp(self.right_leg, target.right_leg, f);
        self.body_lift = damp(self.body_lift, target.body_lift, f);
        self.body_roll = damp(self.body_roll, target.body_roll, f);
    }
}

#[derive(Resource, Clone, Copy, Debug, Default, Deref, DerefMut, Reflect)]
#[reflect(Resource)]
pub struct PoseTarget(pub Pose);

/// Currently displayed pose; only moves through [`Pose::damp_toward`].
#[derive(Resource, Clone, Copy, Debug, Default, Deref, DerefMut, Reflect)]
#[reflect(Resource)]
pub struct AvatarPose(pub Pose);


pub struct AvatarPosePlugin;

impl Plugin for AvatarPosePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewContext>();
        app.init_resource::<AvatarPoseSettings>();
        app.init_resource::<PoseTarget>();
        app.init_resource::<AvatarPose>();

        app.register_type::<ViewContext>();
        app.register_type::<AvatarPoseSettings>();
        app.register_type::<PoseTarget>();
        app.register_type::<AvatarPose>();

        app.add_systems(
            Update,
            (update_pose_target, damp_pose, apply_pose)
                .chain()
                .in_set(AvatarSystems::Pose),
        );
    }
}


pub fn update_pose_target(
    time: Res<Time>,
    view: Res<ViewContext>,
    pointer: Res<PointerState>,
    animation: Res<AnimationState>,
    settings: Res<AvatarPoseSettings>,
    mut target: ResMut<PoseTarget>,
) {
    let gesture = animation.offsets(time.elapsed_secs_f64());
    target.0 = Pose::target(&view, &pointer, gesture, time.elapsed_secs(), &settings);
}

pub fn damp_pose(
    target: Res<PoseTarget>,
    settings: Res<AvatarPoseSettings>,
    mut pose: ResMut<AvatarPose>,
) {
    pose.damp_toward(&target, &settings);
}

pub fn apply_pose(
    time: Res<Time>,
    pose: Res<AvatarPose>,
    settings: Res<AvatarPoseSettings>,
    rig: Option<Res<AvatarRig>>,
    mut transforms: Query<&mut Transform>,
) {
    let Some(rig) = rig else {
        return;
    };

    let bob = (time.elapsed_secs() * settings.bob_frequency).sin() * settings.bob_amplitude;

    if let Ok(mut transform) = transforms.get_mut(rig.offset) {
        transform.translation.x = pose.offset_x;
    }

    if let Ok(mut transform) = transforms.get_mut(rig.pivot) {
        transform.rotation = Quat::from_rotation_y(pose.yaw);
    }

    if let Ok(mut transform) = transforms.get_mut(rig.body) {
        transform.translation.y = bob + pose.body_lift;
        transform.rotation = Quat::from_rotation_z(pose.body_roll);
    }

    if let Ok(mut transform) = transforms.get_mut(rig.head) {
        transform.rotation = Quat::from_euler(EulerRot::XYZ, pose.head_pitch, pose.head_yaw, 0.0);
    }

    let limbs = [
        (LimbSide::Right, LimbKind::Arm, pose.right_arm),
        (LimbSide::Left, LimbKind::Arm, pose.left_arm),
        (LimbSide::Left, LimbKind::Leg, Vec2::new(pose.left_leg, 0.0)),
        (LimbSide::Right, LimbKind::Leg, Vec2::new(pose.right_leg, 0.0)),
    ];
    for (side, kind, euler) in limbs {
        if let Ok(mut transform) = transforms.get_mut(rig.limb(side, kind)) {
            transform.rotation = Quat::from_euler(EulerRot::XYZ, euler.x, 0.0, euler.y);
        }
    }
}

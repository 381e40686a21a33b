use std::f32::consts::{FRAC_PI_2, PI};

use bevy::prelude::*;
use strum_macros::EnumIter;

use crate::{
    material::AvatarMaterials,
    mesh::{arc_tube_mesh, open_frustum_mesh},
    pick::Collider,
    texture::{LabelSettings, SpeckleSettings},
};


/// Interactive body parts. Each built rig carries every variant exactly once.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, Reflect)]
#[reflect(Component)]
pub enum RigPart {
    Head,
    Body,
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
}

impl RigPart {
    /// Stable identifier shared with hosts.
    pub fn tag(&self) -> &'static str {
        match self {
            RigPart::Head => "head",
            RigPart::Body => "body",
            RigPart::LeftHand => "leftHand",
            RigPart::RightHand => "rightHand",
            RigPart::LeftFoot => "leftFoot",
            RigPart::RightFoot => "rightFoot",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RigPart::Head => "head",
            RigPart::Body => "body",
            RigPart::LeftHand => "left hand",
            RigPart::RightHand => "right hand",
            RigPart::LeftFoot => "left foot",
            RigPart::RightFoot => "right foot",
        }
    }
}

impl std::fmt::Display for RigPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}


/// Horizontal offset root; slides with the page layout.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component, Default)]
pub struct AvatarOffset;

/// Yaw pivot driven by drag rotation.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component, Default)]
pub struct AvatarPivot;

/// Everything that bobs: head, torso and limbs.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component, Default)]
pub struct AvatarBody;

#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component, Default)]
pub struct AvatarHead;

/// Anchor of the overlay panel, rigidly attached to the right hand.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component, Default)]
pub struct Emitter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum LimbSide {
    Left,
    Right,
}

impl LimbSide {
    pub fn sign(&self) -> f32 {
        match self {
            LimbSide::Left => -1.0,
            LimbSide::Right => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum LimbKind {
    Arm,
    Leg,
}

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Limb {
    pub side: LimbSide,
    pub kind: LimbKind,
}


/// Named nodes of the spawned avatar.
#[derive(Resource, Clone, Copy, Debug)]
pub struct AvatarRig {
    pub offset: Entity,
    pub pivot: Entity,
    pub body: Entity,
    pub head: Entity,
    pub torso: Entity,
    pub left_arm: Entity,
    pub right_arm: Entity,
    pub left_leg: Entity,
    pub right_leg: Entity,
    pub emitter: Entity,
    parts: [Entity; 6],
}

impl AvatarRig {
    /// Mesh entity tagged with `part`.
    pub fn part(&self, part: RigPart) -> Entity {
        self.parts[part as usize]
    }

    pub fn limb(&self, side: LimbSide, kind: LimbKind) -> Entity {
        match (side, kind) {
            (LimbSide::Left, LimbKind::Arm) => self.left_arm,
            (LimbSide::Right, LimbKind::Arm) => self.right_arm,
            (LimbSide::Left, LimbKind::Leg) => self.left_leg,
            (LimbSide::Right, LimbKind::Leg) => self.right_leg,
        }
    }
}


#[derive(Resource, Clone, Debug, Reflect)]
#[reflect(Resource)]
pub struct AvatarRigSettings {
    pub logo_text: String,
    /// fixed seed for the speckle texture; entropy when unset
    pub texture_seed: Option<u64>,
    pub bump_strength: f32,
    pub speckle: SpeckleSettings,
    pub label: LabelSettings,
}

impl Default for AvatarRigSettings {
    fn default() -> Self {
        Self {
            logo_text: "TaoLi".to_string(),
            texture_seed: None,
            bump_strength: 2.0,
            speckle: SpeckleSettings::default(),
            label: LabelSettings::default(),
        }
    }
}


pub struct AvatarRigPlugin;

impl Plugin for AvatarRigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AvatarRigSettings>();
        app.register_type::<AvatarRigSettings>();

        app.register_type::<RigPart>();
        app.register_type::<Collider>();
        app.register_type::<AvatarOffset>();
        app.register_type::<AvatarPivot>();
        app.register_type::<AvatarBody>();
        app.register_type::<AvatarHead>();
        app.register_type::<Emitter>();
        app.register_type::<Limb>();

        app.add_systems(Startup, spawn_avatar_rig);
    }
}


struct RigBuilder<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    meshes: &'a mut Assets<Mesh>,
    materials: &'a AvatarMaterials,
}

impl RigBuilder<'_, '_, '_> {
    fn group(&mut self, parent: Option<Entity>, name: &'static str, transform: Transform) -> Entity {
        let mut entity = self
            .commands
            .spawn((Name::new(name), transform, Visibility::default()));
        if let Some(parent) = parent {
            entity.insert(ChildOf(parent));
        }
        entity.id()
    }

    fn mesh(
        &mut self,
        parent: Entity,
        name: &'static str,
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        collider: Collider,
        transform: Transform,
    ) -> Entity {
        self.commands
            .spawn((
                Name::new(name),
                Mesh3d(mesh),
                MeshMaterial3d(material),
                collider,
                transform,
                ChildOf(parent),
            ))
            .id()
    }

    fn tagged(
        &mut self,
        parent: Entity,
        part: RigPart,
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        collider: Collider,
        transform: Transform,
    ) -> Entity {
        let entity = self.mesh(parent, part.tag(), mesh, material, collider, transform);
        self.commands.entity(entity).insert(part);
        entity
    }

    /// Sphere mesh with tangents for the bump-mapped shell, falling back to the flat
    /// material when tangents cannot be generated.
    fn shell_sphere(&mut self, radius: f32) -> (Handle<Mesh>, Handle<StandardMaterial>) {
        let mut mesh = Sphere::new(radius).mesh().uv(32, 18);
        let material = match mesh.generate_tangents() {
            Ok(()) => self.materials.peanut.clone(),
            Err(err) => {
                warn!("peanut shell rendered without bump map: {err}");
                self.materials.peanut_flat.clone()
            }
        };
        (self.meshes.add(mesh), material)
    }

    fn head(&mut self, parent: Entity) -> (Entity, Entity) {
        let head = self.group(Some(parent), "head_group", Transform::from_xyz(0.0, 1.1, 0.0));
        self.commands.entity(head).insert(AvatarHead);

        let skull = self.meshes.add(Sphere::new(0.65).mesh().uv(32, 18));
        let head_mesh = self.tagged(
            head,
            RigPart::Head,
            skull,
            self.materials.body.clone(),
            Collider::sphere(0.65),
            Transform::IDENTITY,
        );

        let eye = self.meshes.add(Sphere::new(0.07).mesh().uv(16, 12));
        for (name, x) in [("left_eye", -0.22), ("right_eye", 0.22)] {
            self.mesh(
                head,
                name,
                eye.clone(),
                self.materials.dark.clone(),
                Collider::sphere(0.07),
                Transform::from_xyz(x, 0.1, 0.58),
            );
        }

        let mouth = self.meshes.add(arc_tube_mesh(0.15, 0.02, 8, 16, PI));
        self.mesh(
            head,
            "mouth",
            mouth,
            self.materials.dark.clone(),
            Collider::cuboid(Vec3::new(0.17, 0.17, 0.02)),
            Transform::from_xyz(0.0, -0.1, 0.6).with_rotation(Quat::from_rotation_z(PI)),
        );

        let cheek = self.meshes.add(Circle::new(0.08));
        for (name, x, yaw) in [("left_cheek", -0.35, -0.4), ("right_cheek", 0.35, 0.4)] {
            self.mesh(
                head,
                name,
                cheek.clone(),
                self.materials.cheek.clone(),
                Collider::disk(0.08),
                Transform::from_xyz(x, -0.05, 0.55).with_rotation(Quat::from_rotation_y(yaw)),
            );
        }

        let peanut = self.group(
            Some(head),
            "peanut",
            Transform::from_xyz(0.0, 0.62, 0.0)
                .with_rotation(Quat::from_euler(EulerRot::XYZ, 0.0, 0.1, 0.15)),
        );

        let (lower, material) = self.shell_sphere(0.1);
        self.mesh(
            peanut,
            "peanut_lower",
            lower,
            material,
            Collider::sphere(0.1),
            Transform::from_scale(Vec3::new(1.0, 1.2, 1.0)),
        );

        let (upper, material) = self.shell_sphere(0.08);
        self.mesh(
            peanut,
            "peanut_upper",
            upper,
            material,
            Collider::sphere(0.08),
            Transform::from_xyz(0.02, 0.15, 0.0)
                .with_rotation(Quat::from_rotation_z(-0.1))
                .with_scale(Vec3::new(1.0, 1.15, 1.0)),
        );

        (head, head_mesh)
    }

    fn torso(&mut self, parent: Entity) -> (Entity, Entity) {
        let torso = self.group(Some(parent), "torso_group", Transform::IDENTITY);

        let shell = self.meshes.add(Sphere::new(0.6).mesh().uv(32, 18));
        let torso_mesh = self.tagged(
            torso,
            RigPart::Body,
            shell,
            self.materials.body.clone(),
            Collider::sphere(0.6),
            Transform::from_scale(Vec3::new(1.0, 1.1, 0.9)),
        );

        let band = self.meshes.add(open_frustum_mesh(0.62, 0.62, 0.4, 32));
        self.mesh(
            torso,
            "shirt",
            band,
            self.materials.accent.clone(),
            Collider::frustum(0.62, 0.62, 0.4, false),
            Transform::from_xyz(0.0, 0.1, 0.0),
        );

        let decal = self.meshes.add(Rectangle::new(0.5, 0.25));
        self.mesh(
            torso,
            "logo",
            decal,
            self.materials.logo.clone(),
            Collider::rectangle(0.5, 0.25),
            Transform::from_xyz(0.0, 0.1, 0.63),
        );

        (torso, torso_mesh)
    }

    /// Returns the limb root and its tagged extremity (hand or foot).
    fn limb(&mut self, parent: Entity, side: LimbSide, kind: LimbKind) -> (Entity, Entity) {
        let s = side.sign();
        let limb = Limb { side, kind };

        match kind {
            LimbKind::Arm => {
                let name = match side {
                    LimbSide::Left => "left_arm",
                    LimbSide::Right => "right_arm",
                };
                let root = self.group(Some(parent), name, Transform::from_xyz(s * 0.55, 0.4, 0.0));
                self.commands.entity(root).insert(limb);

                let upper = self.meshes.add(Capsule3d::new(0.13, 0.5));
                self.mesh(
                    root,
                    "upper_arm",
                    upper,
                    self.materials.body.clone(),
                    Collider::capsule(0.13, 0.5),
                    Transform::from_xyz(s * 0.05, -0.3, 0.0),
                );

                let part = match side {
                    LimbSide::Left => RigPart::LeftHand,
                    LimbSide::Right => RigPart::RightHand,
                };
                let palm = self.meshes.add(Sphere::new(0.16).mesh().uv(16, 12));
                let hand = self.tagged(
                    root,
                    part,
                    palm,
                    self.materials.body.clone(),
                    Collider::sphere(0.16),
                    Transform::from_xyz(s * 0.05, -0.65, 0.0),
                );

                (root, hand)
            }
            LimbKind::Leg => {
                let name = match side {
                    LimbSide::Left => "left_leg",
                    LimbSide::Right => "right_leg",
                };
                let root = self.group(Some(parent), name, Transform::from_xyz(s * 0.25, -0.6, 0.0));
                self.commands.entity(root).insert(limb);

                let thigh = self.meshes.add(Capsule3d::new(0.14, 0.4));
                self.mesh(
                    root,
                    "thigh",
                    thigh,
                    self.materials.body.clone(),
                    Collider::capsule(0.14, 0.4),
                    Transform::from_xyz(0.0, -0.2, 0.0),
                );

                let part = match side {
                    LimbSide::Left => RigPart::LeftFoot,
                    LimbSide::Right => RigPart::RightFoot,
                };
                let sole = self.meshes.add(Capsule3d::new(0.15, 0.2));
                let foot = self.tagged(
                    root,
                    part,
                    sole,
                    self.materials.body.clone(),
                    Collider::capsule(0.15, 0.2),
                    Transform::from_xyz(0.0, -0.5, 0.1)
                        .with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
                );

                (root, foot)
            }
        }
    }

    fn emitter(&mut self, hand: Entity) -> Entity {
        let emitter = self
            .commands
            .spawn((
                Name::new("emitter"),
                Emitter,
                Transform::from_xyz(0.0, 0.0, 0.16)
                    .with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
                Visibility::default(),
                ChildOf(hand),
            ))
            .id();

        let puck = self.meshes.add(ConicalFrustum {
            radius_top: 0.1,
            radius_bottom: 0.12,
            height: 0.05,
        });
        self.mesh(
            emitter,
            "emitter_puck",
            puck,
            self.materials.dark.clone(),
            Collider::frustum(0.1, 0.12, 0.05, true),
            Transform::IDENTITY,
        );

        let beam = self.meshes.add(open_frustum_mesh(0.3, 0.05, 0.6, 16));
        self.mesh(
            emitter,
            "emitter_beam",
            beam,
            self.materials.beam.clone(),
            Collider::frustum(0.3, 0.05, 0.6, false),
            Transform::from_xyz(0.0, 0.35, 0.0),
        );

        emitter
    }
}


pub fn spawn_avatar_rig(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    materials: Res<AvatarMaterials>,
) {
    let mut builder = RigBuilder {
        commands: &mut commands,
        meshes: &mut meshes,
        materials: &materials,
    };

    let offset = builder.group(None, "avatar", Transform::IDENTITY);
    builder.commands.entity(offset).insert(AvatarOffset);

    let pivot = builder.group(Some(offset), "avatar_pivot", Transform::IDENTITY);
    builder.commands.entity(pivot).insert(AvatarPivot);

    let body = builder.group(Some(pivot), "avatar_body", Transform::IDENTITY);
    builder.commands.entity(body).insert(AvatarBody);

    let (head, head_mesh) = builder.head(body);
    let (torso, torso_mesh) = builder.torso(body);
    let (left_arm, left_hand) = builder.limb(body, LimbSide::Left, LimbKind::Arm);
    let (right_arm, right_hand) = builder.limb(body, LimbSide::Right, LimbKind::Arm);
    let (left_leg, left_foot) = builder.limb(body, LimbSide::Left, LimbKind::Leg);
    let (right_leg, right_foot) = builder.limb(body, LimbSide::Right, LimbKind::Leg);
    let emitter = builder.emitter(right_hand);

    let rig = AvatarRig {
        offset,
        pivot,
        body,
        head,
        torso,
        left_arm,
        right_arm,
        left_leg,
        right_leg,
        emitter,
        parts: [
            head_mesh,
            torso_mesh,
            left_hand,
            right_hand,
            left_foot,
            right_foot,
        ],
    };

    info!("spawned avatar rig (root {offset})");
    commands.insert_resource(rig);
}


#[cfg(test)]
mod tests {
    use super::*;
    use bevy::{
        ecs::system::RunSystemOnce,
        transform::TransformPlugin,
        MinimalPlugins,
    };
    use strum::IntoEnumIterator;

    use crate::material::build_materials;

    fn rig_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default(), TransformPlugin));
        app.init_asset::<Mesh>();
        app.init_asset::<StandardMaterial>();
        app.init_asset::<Image>();
        app.insert_resource(AvatarRigSettings {
            texture_seed: Some(11),
            ..default()
        });

        app.world_mut().run_system_once(build_materials).unwrap();
        app.world_mut().run_system_once(spawn_avatar_rig).unwrap();
        app.update();
        app
    }

    #[test]
    fn every_part_is_tagged_exactly_once() {
        let mut app = rig_app();
        let world = app.world_mut();

        let tags: Vec<(Entity, RigPart)> = world
            .query::<(Entity, &RigPart)>()
            .iter(world)
            .map(|(entity, part)| (entity, *part))
            .collect();
        assert_eq!(tags.len(), RigPart::iter().count());

        let rig = *world.resource::<AvatarRig>();
        for part in RigPart::iter() {
            let matching: Vec<_> = tags.iter().filter(|(_, tag)| *tag == part).collect();
            assert_eq!(matching.len(), 1, "{part} tagged {} times", matching.len());
            assert_eq!(matching[0].0, rig.part(part));
        }
    }

    #[test]
    fn single_emitter_hangs_off_right_hand() {
        let mut app = rig_app();
        let world = app.world_mut();

        let emitters: Vec<Entity> = world
            .query_filtered::<Entity, With<Emitter>>()
            .iter(world)
            .collect();
        assert_eq!(emitters.len(), 1);

        let rig = *world.resource::<AvatarRig>();
        assert_eq!(emitters[0], rig.emitter);

        let mut ancestor = emitters[0];
        let mut found = false;
        while let Some(parent) = world.get::<ChildOf>(ancestor).map(ChildOf::parent) {
            if parent == rig.part(RigPart::RightHand) {
                found = true;
                break;
            }
            ancestor = parent;
        }
        assert!(found, "emitter must be a descendant of the right hand");
    }

    #[test]
    fn every_mesh_has_a_collider() {
        let mut app = rig_app();
        let world = app.world_mut();

        let meshes = world.query::<&Mesh3d>().iter(world).count();
        let colliders = world
            .query_filtered::<(), (With<Mesh3d>, With<Collider>)>()
            .iter(world)
            .count();
        assert!(meshes > RigPart::iter().count());
        assert_eq!(meshes, colliders);
    }

    #[test]
    fn head_sits_above_torso_in_world_space() {
        let mut app = rig_app();
        let world = app.world_mut();
        let rig = *world.resource::<AvatarRig>();

        let head = world.get::<GlobalTransform>(rig.part(RigPart::Head)).unwrap();
        let torso = world.get::<GlobalTransform>(rig.part(RigPart::Body)).unwrap();
        assert!((head.translation().y - 1.1).abs() < 1e-5);
        assert!(head.translation().y > torso.translation().y);
    }
}

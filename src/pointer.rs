use bevy::{
    input::{
        mouse::MouseButtonInput,
        ButtonState,
    },
    prelude::*,
    window::{
        PrimaryWindow,
        WindowEvent,
    },
};

use crate::{
    camera::{
        AvatarCamera,
        CameraView,
        SceneViewport,
    },
    pick::{
        cast_ray,
        Collider,
    },
    rig::RigPart,
    scene::AvatarSystems,
};


/// Normalized pointer input, fed from window events or written directly by hosts.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Moved { position: Vec2 },
    Pressed { position: Vec2 },
    Released { position: Vec2 },
    Left,
}

/// Cursor feedback the host should display.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
#[reflect(Resource)]
pub enum PointerAffordance {
    #[default]
    Default,
    Grab,
    Grabbing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum InteractionKind {
    Touch,
    ChatToggle,
    Wave,
    Dance,
    Travel,
}

/// Outbound notification for whoever owns conversational feedback.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct AvatarInteraction {
    pub kind: InteractionKind,
    pub part: Option<RigPart>,
    pub message: Option<String>,
}

impl AvatarInteraction {
    pub fn touch(part: RigPart) -> Self {
        Self {
            kind: InteractionKind::Touch,
            part: Some(part),
            message: Some(format!("You touched my {}!", part.display_name())),
        }
    }

    pub fn chat_toggle() -> Self {
        Self {
            kind: InteractionKind::ChatToggle,
            part: None,
            message: None,
        }
    }
}


#[derive(Resource, Clone, Debug, Reflect)]
#[reflect(Resource)]
pub struct AvatarPointerSettings {
    /// radians of yaw per dragged pixel
    pub drag_sensitivity: f32,
}

impl Default for AvatarPointerSettings {
    fn default() -> Self {
        Self {
            drag_sensitivity: 0.005,
        }
    }
}


#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct PointerState {
    /// cursor in normalized device coordinates, clamped to [-1, 1]
    pub ndc: Vec2,
    pub dragging: bool,
    pub last_drag_x: f32,
    pub target_yaw: f32,
}

impl PointerState {
    /// Returns `true` when the move was consumed by a drag.
    pub fn on_move(&mut self, ndc: Vec2, x: f32, sensitivity: f32) -> bool {
        self.ndc = ndc.clamp(Vec2::NEG_ONE, Vec2::ONE);

        if !self.dragging {
            return false;
        }

        self.target_yaw += (x - self.last_drag_x) * sensitivity;
        self.last_drag_x = x;
        true
    }

    pub fn on_press(&mut self, x: f32) {
        self.dragging = true;
        self.last_drag_x = x;
    }

    pub fn on_release(&mut self) {
        self.dragging = false;
    }

    pub fn cancel_drag(&mut self) {
        self.dragging = false;
    }
}


pub struct AvatarPointerPlugin;

impl Plugin for AvatarPointerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PointerInput>();
        app.add_event::<AvatarInteraction>();

        app.init_resource::<PointerState>();
        app.init_resource::<PointerAffordance>();
        app.init_resource::<AvatarPointerSettings>();

        app.register_type::<PointerState>();
        app.register_type::<PointerAffordance>();
        app.register_type::<AvatarPointerSettings>();

        app.add_event::<WindowEvent>();

        app.add_systems(PreUpdate, forward_window_pointer);
        app.add_systems(Update, process_pointer_input.in_set(AvatarSystems::Input));
    }
}


/// Translates primary-window cursor and left-button events into [`PointerInput`],
/// preserving their arrival order.
pub fn forward_window_pointer(
    mut window_events: EventReader<WindowEvent>,
    primary: Query<Entity, With<PrimaryWindow>>,
    mut cursor: Local<Vec2>,
    mut inputs: EventWriter<PointerInput>,
) {
    let Ok(primary) = primary.single() else {
        window_events.clear();
        return;
    };

    for event in window_events.read() {
        match event {
            WindowEvent::CursorMoved(moved) if moved.window == primary => {
                *cursor = moved.position;
                inputs.write(PointerInput::Moved {
                    position: moved.position,
                });
            }
            WindowEvent::CursorLeft(left) if left.window == primary => {
                inputs.write(PointerInput::Left);
            }
            WindowEvent::MouseButtonInput(MouseButtonInput {
                button: MouseButton::Left,
                state,
                window,
            }) if *window == primary => {
                let position = *cursor;
                inputs.write(match state {
                    ButtonState::Pressed => PointerInput::Pressed { position },
                    ButtonState::Released => PointerInput::Released { position },
                });
            }
            _ => {}
        }
    }
}


pub fn process_pointer_input(
    mut inputs: EventReader<PointerInput>,
    settings: Res<AvatarPointerSettings>,
    viewport: Res<SceneViewport>,
    mut state: ResMut<PointerState>,
    mut affordance: ResMut<PointerAffordance>,
    camera: Query<(&Projection, &GlobalTransform), With<AvatarCamera>>,
    colliders: Query<(Entity, &GlobalTransform, &Collider, Option<&RigPart>)>,
    mut interactions: EventWriter<AvatarInteraction>,
) {
    let view = camera
        .single()
        .ok()
        .and_then(|(projection, transform)| CameraView::new(projection, transform, *viewport));

    let pick = |position: Vec2| {
        view.as_ref()
            .and_then(|view| view.ray_through_pixel(position))
            .and_then(|ray| cast_ray(ray, colliders.iter()))
    };

    // hover only needs the latest position of the frame
    let mut hover = None;

    for input in inputs.read() {
        match *input {
            PointerInput::Moved { position } => {
                let ndc = viewport.to_ndc(position);
                if state.on_move(ndc, position.x, settings.drag_sensitivity) {
                    hover = None;
                } else {
                    hover = Some(position);
                }
            }
            PointerInput::Pressed { position } => {
                hover = None;
                state.on_press(position.x);
                *affordance = PointerAffordance::Grabbing;
            }
            PointerInput::Released { position } => {
                state.on_release();
                *affordance = PointerAffordance::Default;

                if let Some(part) = pick(position).and_then(|hit| hit.part) {
                    debug!("touched {part}");
                    interactions.write(AvatarInteraction::touch(part));
                }
            }
            PointerInput::Left => {
                hover = None;
                state.cancel_drag();
                *affordance = PointerAffordance::Default;
            }
        }
    }

    if let Some(position) = hover {
        *affordance = if pick(position).is_some() {
            PointerAffordance::Grab
        } else {
            PointerAffordance::Default
        };
    }
}

//! Stride - headless walkthrough of the player movement core
//!
//! Builds a small rapier scene (ground, wall, ramp, loose crate), spawns one
//! character and drives it with scripted input through a fixed-timestep loop.
//!
//! Usage: `stride [character.toml] [--write-config]`

mod settings;

use std::path::PathBuf;

use anyhow::Result;
use glam::{Quat, Vec3};
use stride_core::{GameTime, TimeConfig};
use stride_game::{
    AnimationBindings, CameraDirectory, CameraMode, ControllerEvent, InputAction, LookAngles,
    PlayerController,
};
use stride_physics::{PhysicsConfig, PhysicsWorld};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Render rate the walkthrough pretends to run at
const FRAME_DT: f32 = 1.0 / 144.0;

/// One stretch of scripted input
struct Phase {
    name: &'static str,
    seconds: f32,
    hold: &'static [InputAction],
    yaw_degrees: f32,
    jump: bool,
}

const SCRIPT: &[Phase] = &[
    Phase {
        name: "settle",
        seconds: 0.5,
        hold: &[],
        yaw_degrees: 0.0,
        jump: false,
    },
    Phase {
        name: "walk toward the crate",
        seconds: 1.5,
        hold: &[InputAction::MoveForward],
        yaw_degrees: 0.0,
        jump: false,
    },
    Phase {
        name: "sprint",
        seconds: 1.0,
        hold: &[InputAction::MoveForward, InputAction::Sprint],
        yaw_degrees: 0.0,
        jump: false,
    },
    Phase {
        name: "slide",
        seconds: 1.0,
        hold: &[InputAction::MoveForward, InputAction::Crouch],
        yaw_degrees: 0.0,
        jump: false,
    },
    Phase {
        name: "jump",
        seconds: 1.0,
        hold: &[InputAction::MoveForward],
        yaw_degrees: 0.0,
        jump: true,
    },
    Phase {
        name: "run into the wall",
        seconds: 2.0,
        hold: &[InputAction::MoveForward],
        yaw_degrees: 0.0,
        jump: false,
    },
    Phase {
        name: "strafe up the ramp",
        seconds: 3.0,
        hold: &[InputAction::MoveForward],
        yaw_degrees: -90.0,
        jump: false,
    },
    Phase {
        name: "stand",
        seconds: 1.0,
        hold: &[],
        yaw_degrees: -90.0,
        jump: false,
    },
];

fn build_scene() -> PhysicsWorld {
    let mut world = PhysicsWorld::with_config(PhysicsConfig::default());
    world.create_ground(0.0);

    // Wall across the path
    world.create_static_box(Vec3::new(6.0, 2.0, 0.5), Vec3::new(0.0, 2.0, -16.0));

    // 20° ramp off to the right
    world.create_oriented_box(
        Vec3::new(1.5, 0.2, 4.0),
        Vec3::new(6.0, 0.8, -13.0),
        Quat::from_rotation_z(20f32.to_radians()),
    );

    // Crate in the walking line
    world.create_dynamic_box(Vec3::splat(0.4), Vec3::new(0.0, 0.4, -6.0), 50.0);

    world.update_queries();
    world
}

/// Clip names of the rig the walkthrough pretends to drive
fn demo_bindings() -> AnimationBindings {
    AnimationBindings {
        idle: Some("idle".into()),
        walk: Some("walk".into()),
        sprint: Some("run".into()),
        jump: Some("jump".into()),
        fall: Some("fall".into()),
        crouch: Some("crouch".into()),
        slide: Some("slide".into()),
    }
}

fn log_event(phase: &str, event: &ControllerEvent) {
    match event {
        ControllerEvent::AnimationChanged { tag, clip } => {
            debug!(phase, ?tag, ?clip, "Animation changed")
        }
        other => info!(phase, "{:?}", other),
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config_path: Option<PathBuf> = None;
    let mut write_config = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--write-config" => write_config = true,
            path => config_path = Some(PathBuf::from(path)),
        }
    }

    let config = match &config_path {
        Some(path) => settings::load_from(path),
        None => settings::load(),
    };
    if write_config {
        let path = settings::save(&config)?;
        info!("Wrote character settings to {:?}", path);
    }

    info!("Starting Stride walkthrough ({:?} camera)", config.camera.mode);

    let mut world = build_scene();
    let mut cameras = CameraDirectory::new();
    let mut controller = PlayerController::new(config)?;
    controller.initialize(&mut world, Vec3::new(0.0, 0.1, 0.0))?;
    if controller.config().animations.is_none() {
        controller.update_config(|c| c.animations = Some(demo_bindings()))?;
    }
    controller.attach_animations(&["idle", "walk", "run", "jump", "fall", "crouch", "slide"]);
    controller.activate_camera(&mut cameras);
    controller.input_mut().press(InputAction::CapturePointer);

    let mut time = GameTime::new(TimeConfig::default());
    let fixed_dt = time.config.fixed_timestep;

    for phase in SCRIPT {
        info!(phase = phase.name, seconds = phase.seconds, "Phase");

        let input = controller.input_mut();
        for action in [
            InputAction::MoveForward,
            InputAction::MoveBackward,
            InputAction::MoveLeft,
            InputAction::MoveRight,
            InputAction::Sprint,
            InputAction::Crouch,
        ] {
            input.release(action);
        }
        for action in phase.hold {
            input.press(*action);
        }
        let look = input.look();
        input.set_look(LookAngles {
            pitch: look.pitch,
            yaw: phase.yaw_degrees.to_radians(),
        });
        if phase.jump {
            controller.jump();
        }

        let mut elapsed = 0.0;
        while elapsed < phase.seconds {
            time.update(FRAME_DT);
            elapsed += FRAME_DT;

            for _ in 0..time.fixed_steps() {
                let report = controller.update(&mut world, fixed_dt);
                world.step();
                controller.publish_camera(&mut cameras);

                for event in &report.events {
                    log_event(phase.name, event);
                }
            }
        }

        let state = controller.state();
        let transform = controller.transform();
        info!(
            phase = phase.name,
            position = ?transform.position,
            facing = ?transform.forward(),
            speed = state.current_speed,
            grounded = state.is_grounded,
            crouching = state.is_crouching,
            sliding = state.is_sliding,
            "Phase complete"
        );
    }

    if controller.camera().mode() == CameraMode::ThirdPerson {
        let pose = controller.camera().pose();
        info!(
            camera = ?pose.position,
            distance = controller.camera().offset().length(),
            "Final camera"
        );
    }

    controller.dispose(&mut world, &mut cameras);
    info!(frames = time.frame_count, "Walkthrough finished");
    Ok(())
}

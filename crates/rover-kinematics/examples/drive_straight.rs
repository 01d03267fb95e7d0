use rover_kinematics::*;

fn main() {
    let wheel_diameter_mm = DEFAULT_WHEEL_DIAMETER_MM;
    let axle_track_mm = DEFAULT_AXLE_TRACK_MM;
    let geometry_result =
        StepperGeometry::new(wheel_diameter_mm, axle_track_mm, BYJ48_HALF_STEPS_PER_REVOLUTION);

    let mut current_pose = Pose::new(0.0, 0.0, 0.0);
    let leg_cm = 10.0;
    let num_legs = 4;

    match geometry_result {
        Ok(geometry) => {
            println!("Initializing simulation...");
            println!("  Geometry:       {}", geometry);
            println!("  Circumference:  {:.2} cm", geometry.wheel_circumference_cm());
            match geometry.steps_for_distance(leg_cm) {
                Ok(steps) => println!("  Steps per leg:  {} ({} cm)", steps, leg_cm),
                Err(e) => {
                    eprintln!("Cannot convert leg length: {}", e);
                    return;
                }
            }
            println!("\nSimulating...");

            for i in 0..num_legs {
                current_pose = geometry.advance(current_pose, leg_cm);
                println!("Leg {:>2}: forward  -> {}", i + 1, current_pose);

                // Same maneuver the drive loop uses when an obstacle is near.
                let travel = geometry.wheel_travel_cm(Turn::Quarter);
                current_pose = geometry.pivot(current_pose, WheelSide::Left, travel);
                current_pose = geometry.pivot(current_pose, WheelSide::Right, -travel);
                println!("Leg {:>2}: turned   -> {}", i + 1, current_pose);
            }

            println!("\nSimulation complete.");
            println!("Final Pose: {:?}", current_pose);
        }
        Err(e) => {
            eprintln!("Failed to initialize geometry: {:?}", e);
            eprintln!(
                "Please ensure wheel_diameter_mm ({}) and axle_track_mm ({}) are positive.",
                wheel_diameter_mm, axle_track_mm
            );
        }
    }
}

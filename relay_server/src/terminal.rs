/// Topics reported by the mock `ros2 topic list`.
const ROS_TOPICS: [&str; 5] = [
    "/robot/odom",
    "/robot/cmd_vel",
    "/robot/battery_state",
    "/robot/scan",
    "/robot/diagnostics",
];

/// Canned output lines for one diagnostics terminal command.
///
/// The first line always echoes the command; what follows depends on a
/// few recognized ROS 2 commands. `clear` gets no further output since
/// the client wipes its own scrollback.
pub fn response_lines(command: &str) -> Vec<String> {
    let mut lines = vec![format!("Executing: {}", command)];

    if command.contains("ros2 topic list") {
        lines.extend(ROS_TOPICS.iter().map(|topic| topic.to_string()));
    } else if command.contains("ros2 topic echo") {
        lines.push("---".to_string());
        lines.push("position: {x: 1.2, y: 0.5, z: 0.0}".to_string());
        lines.push("velocity: {linear: 0.5, angular: 0.0}".to_string());
        lines.push("---".to_string());
    } else if command == "clear" {
        // Echo line only
    } else {
        lines.push(format!("Command completed: {}", command));
    }

    lines
}

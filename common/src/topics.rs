pub const TOPIC_STATE: &str = "thermorelay/relay/state";
pub const TOPIC_TEMPERATURE: &str = "thermorelay/sensor/temperature";
pub const TOPIC_AVAILABILITY: &str = "thermorelay/availability";
pub const TOPIC_COMMAND: &str = "thermorelay/relay/set";

pub const AVAILABILITY_ONLINE: &str = "online";
pub const AVAILABILITY_OFFLINE: &str = "offline";

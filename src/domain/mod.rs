// Domain layer: bestseller models and ports (interfaces). 只依賴 std / serde / chrono。

pub mod model;
pub mod ports;

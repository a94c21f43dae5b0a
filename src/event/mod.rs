/// 前日收盤價報表
pub mod previous_close;

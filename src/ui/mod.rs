/// User interface: the crop canvas and the three screens

pub mod canvas;
pub mod views;

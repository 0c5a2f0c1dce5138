//! Ready-made architectures built on the [`Model`] API.
//!
//! ```ignore
//! let mut model = Architecture::Resnet50.build()?;
//! let report = model.profile()?;
//! ```

pub mod resnet;
pub mod vgg;

pub use resnet::{resnet, resnet101, resnet152, resnet18, resnet34, resnet50, ResidualBlock};
pub use vgg::{vgg, vgg11, vgg13, vgg16, vgg19};

use crate::model::Model;
use crate::net::NetResult;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    Vgg11,
    Vgg13,
    Vgg16,
    Vgg19,
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

impl Architecture {
    pub fn build(self) -> NetResult<Model> {
        match self {
            Architecture::Vgg11 => vgg11(),
            Architecture::Vgg13 => vgg13(),
            Architecture::Vgg16 => vgg16(),
            Architecture::Vgg19 => vgg19(),
            Architecture::Resnet18 => resnet18(),
            Architecture::Resnet34 => resnet34(),
            Architecture::Resnet50 => resnet50(),
            Architecture::Resnet101 => resnet101(),
            Architecture::Resnet152 => resnet152(),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::Vgg11 => "vgg11",
            Architecture::Vgg13 => "vgg13",
            Architecture::Vgg16 => "vgg16",
            Architecture::Vgg19 => "vgg19",
            Architecture::Resnet18 => "resnet18",
            Architecture::Resnet34 => "resnet34",
            Architecture::Resnet50 => "resnet50",
            Architecture::Resnet101 => "resnet101",
            Architecture::Resnet152 => "resnet152",
        };
        f.write_str(name)
    }
}

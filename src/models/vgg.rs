//! VGG networks (Simonyan & Zisserman).

use crate::model::Model;
use crate::net::{NetResult, NodeId};
use crate::nn::{Conv2dConfig, LinearConfig, Nonlinearity, PoolConfig};
use crate::tensor::Shape;

const STAGE_WIDTHS: [usize; 5] = [64, 128, 256, 512, 512];

/// Convolutions per stage of the standard variants.
pub const VGG11: [usize; 5] = [1, 1, 2, 2, 2];
pub const VGG13: [usize; 5] = [2, 2, 2, 2, 2];
pub const VGG16: [usize; 5] = [2, 2, 3, 3, 3];
pub const VGG19: [usize; 5] = [2, 2, 4, 4, 4];

/// Builds a VGG network.
///
/// Every stage stacks `convs[stage]` 3x3 convolutions, each followed by a
/// ReLU, and ends with a 2x2 max pool. The classifier is two 4096-wide
/// fully connected layers with dropout, then the `classes`-wide output.
pub fn vgg(convs: [usize; 5], input_shape: Shape, classes: usize) -> NetResult<Model> {
    let mut model = Model::new();
    let mut x = model.input("input", input_shape)?;

    for (stage, (&count, &width)) in convs.iter().zip(STAGE_WIDTHS.iter()).enumerate() {
        let s = stage + 1;
        for i in 1..=count {
            let suffix = if count == 1 { format!("{}", s) } else { format!("{}_{}", s, i) };
            x = model.conv2d(&format!("conv{}", suffix), &[x], Conv2dConfig::square(width, 3))?;
            x = model.nl(&format!("relu{}", suffix), x, Nonlinearity::Relu)?;
        }
        x = model.pool(&format!("pool{}", s), x, PoolConfig::max((2, 2), (2, 2)))?;
    }

    x = classifier_block(&mut model, x, 1)?;
    x = classifier_block(&mut model, x, 2)?;
    model.fc("fc3", &[x], LinearConfig::new(classes))?;
    Ok(model)
}

fn classifier_block(model: &mut Model, x: NodeId, index: usize) -> NetResult<NodeId> {
    let x = model.fc(&format!("fc{}", index), &[x], LinearConfig::new(4096))?;
    let x = model.nl(&format!("fc{}_relu", index), x, Nonlinearity::Relu)?;
    model.dropout(&format!("drop{}", index), x, 0.5)
}

pub fn vgg11() -> NetResult<Model> {
    vgg(VGG11, vec![3, 224, 224], 1000)
}

pub fn vgg13() -> NetResult<Model> {
    vgg(VGG13, vec![3, 224, 224], 1000)
}

pub fn vgg16() -> NetResult<Model> {
    vgg(VGG16, vec![3, 224, 224], 1000)
}

pub fn vgg19() -> NetResult<Model> {
    vgg(VGG19, vec![3, 224, 224], 1000)
}

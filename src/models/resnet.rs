//! Residual networks (He et al.).

use crate::model::Model;
use crate::net::{NetResult, NodeId};
use crate::nn::{Conv2dConfig, LinearConfig, Nonlinearity, PoolConfig};
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualBlock {
    /// Two 3x3 convolutions.
    Plain,
    /// 1x1 reduce, 3x3, 1x1 expand by 4.
    Bottleneck,
}

/// Builds a ResNet for 3x224x224 inputs.
///
/// The stem is a 64-wide 7x7 stride-2 convolution, ReLU and 2x2 max pool.
/// `widths[i]` is the output width of the blocks of stage `i`, `blocks[i]`
/// their number. The first block of every stage but the first downsamples by
/// 2; a 1x1 projection shortcut is inserted whenever the block output shape
/// differs from its input.
pub fn resnet(
    widths: [usize; 4],
    blocks: [usize; 4],
    block: ResidualBlock,
    classes: usize,
) -> NetResult<Model> {
    let mut model = Model::new();
    let mut x = model.input("input", vec![3, 224, 224])?;

    x = model.conv2d("conv1", &[x], Conv2dConfig::new(STEM_WIDTH, (7, 7)).with_stride((2, 2)))?;
    x = model.nl("relu1", x, Nonlinearity::Relu)?;
    x = model.pool("pool1", x, PoolConfig::max((2, 2), (2, 2)))?;

    for stage in 0..4 {
        for j in 0..blocks[stage] {
            let name = format!("res{}{}", stage, j);
            let stride = if stage > 0 && j == 0 { 2 } else { 1 };
            x = match block {
                ResidualBlock::Plain => plain_block(&mut model, &name, x, widths[stage], stride)?,
                ResidualBlock::Bottleneck => bottleneck(&mut model, &name, x, widths[stage], stride)?,
            };
        }
    }

    x = model.pool("avg_pool", x, PoolConfig::global())?;
    model.fc("fc", &[x], LinearConfig::new(classes))?;
    Ok(model)
}

fn plain_block(model: &mut Model, name: &str, src: NodeId, width: usize, stride: usize) -> NetResult<NodeId> {
    let mut x = model.conv2d(
        &format!("{}_conv1", name),
        &[src],
        Conv2dConfig::square(width, 3).with_stride((stride, stride)),
    )?;
    x = model.nl(&format!("{}_relu1", name), x, Nonlinearity::Relu)?;
    x = model.conv2d(&format!("{}_conv2", name), &[x], Conv2dConfig::square(width, 3))?;

    let shortcut = shortcut(model, name, src, x, width, stride)?;
    x = model.elewise(&format!("{}_add", name), x, shortcut)?;
    model.nl(&format!("{}_relu2", name), x, Nonlinearity::Relu)
}

fn bottleneck(model: &mut Model, name: &str, src: NodeId, width: usize, stride: usize) -> NetResult<NodeId> {
    let inner = width / 4;
    let mut x = model.conv2d(
        &format!("{}_conv1", name),
        &[src],
        Conv2dConfig::square(inner, 1).with_stride((stride, stride)),
    )?;
    x = model.nl(&format!("{}_relu1", name), x, Nonlinearity::Relu)?;
    x = model.conv2d(&format!("{}_conv2", name), &[x], Conv2dConfig::square(inner, 3))?;
    x = model.nl(&format!("{}_relu2", name), x, Nonlinearity::Relu)?;
    x = model.conv2d(&format!("{}_conv3", name), &[x], Conv2dConfig::square(width, 1))?;

    let shortcut = shortcut(model, name, src, x, width, stride)?;
    x = model.elewise(&format!("{}_add", name), x, shortcut)?;
    model.nl(&format!("{}_relu3", name), x, Nonlinearity::Relu)
}

/// Identity if shapes agree, 1x1 projection otherwise.
fn shortcut(
    model: &mut Model,
    name: &str,
    src: NodeId,
    out: NodeId,
    width: usize,
    stride: usize,
) -> NetResult<NodeId> {
    let src_out = model.get_node(src)?.output();
    let block_out = model.get_node(out)?.output();
    if Tensor::shapes_match(src_out, block_out) {
        return Ok(src);
    }
    model.conv2d(
        &format!("{}_short", name),
        &[src],
        Conv2dConfig::square(width, 1).with_stride((stride, stride)),
    )
}

const STEM_WIDTH: usize = 64;
const PLAIN_WIDTHS: [usize; 4] = [64, 128, 256, 512];
const BOTTLENECK_WIDTHS: [usize; 4] = [256, 512, 1024, 2048];

pub fn resnet18() -> NetResult<Model> {
    resnet(PLAIN_WIDTHS, [2, 2, 2, 2], ResidualBlock::Plain, 1000)
}

pub fn resnet34() -> NetResult<Model> {
    resnet(PLAIN_WIDTHS, [3, 4, 6, 3], ResidualBlock::Plain, 1000)
}

pub fn resnet50() -> NetResult<Model> {
    resnet(BOTTLENECK_WIDTHS, [3, 4, 6, 3], ResidualBlock::Bottleneck, 1000)
}

pub fn resnet101() -> NetResult<Model> {
    resnet(BOTTLENECK_WIDTHS, [3, 4, 23, 3], ResidualBlock::Bottleneck, 1000)
}

pub fn resnet152() -> NetResult<Model> {
    resnet(BOTTLENECK_WIDTHS, [3, 8, 36, 3], ResidualBlock::Bottleneck, 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resnet18_shapes() {
        let model = resnet18().unwrap();
        assert_eq!(model.find("conv1").unwrap().output().shape(), &[64, 112, 112]);
        assert_eq!(model.find("pool1").unwrap().output().shape(), &[64, 56, 56]);
        assert_eq!(model.find("res31_relu2").unwrap().output().shape(), &[512, 7, 7]);
        assert_eq!(model.find("avg_pool").unwrap().output().shape(), &[512, 1, 1]);
        assert_eq!(model.find("fc").unwrap().output().shape(), &[1000]);
    }

    #[test]
    fn test_projection_shortcuts_only_when_needed() {
        let model = resnet18().unwrap();
        // Stage 0 keeps 64x56x56 and uses identity shortcuts.
        assert!(model.find("res00_short").is_err());
        assert!(model.find("res10_short").is_ok());
        assert!(model.find("res11_short").is_err());

        let add = model.find("res00_add").unwrap();
        assert_eq!(add.sources()[1], model.id_of("pool1").unwrap());
    }

    #[test]
    fn test_resnet50_bottleneck_projection_on_first_block() {
        let model = resnet50().unwrap();
        assert!(model.find("res00_short").is_ok());
        assert_eq!(model.find("res00_conv3").unwrap().output().shape(), &[256, 56, 56]);
        assert_eq!(model.find("res30_add").unwrap().output().shape(), &[2048, 7, 7]);
        assert_eq!(model.find("fc").unwrap().input().shape(), &[2048]);
    }

    #[test]
    fn test_resnet_depths() {
        let convs = |m: &Model| m.iter().filter(|n| n.kind().tag() == "conv2d").count();
        // conv1 + 2 per plain block + 3 projections
        assert_eq!(convs(&resnet18().unwrap()), 1 + 16 + 3);
        assert_eq!(convs(&resnet34().unwrap()), 1 + 32 + 3);
        // conv1 + 3 per bottleneck + 4 projections
        assert_eq!(convs(&resnet50().unwrap()), 1 + 48 + 4);
        assert_eq!(convs(&resnet101().unwrap()), 1 + 99 + 4);
        assert_eq!(convs(&resnet152().unwrap()), 1 + 150 + 4);
    }
}

//! Retained accessor stream conversion.
//!
//! Mesh attribute conversions are volatile — they live in their output
//! buffers and the intermediate data drops at finalize. The streams here
//! (inverse bind matrices, animation channels, GPU-instancing transforms)
//! are the ones flagged `REQUIRED_FOR_INSTANTIATION`: their converted form
//! is kept in the output keyed by accessor index, so downstream
//! instantiation code can pick them up after cleanup.
//!
//! A failing stream is isolated: the channel or skin entry is dropped with
//! a logged code and the rest of the asset continues.

use std::collections::HashMap;

use gltf_dep::accessor::Accessor;

use super::access::resolve_bytes;
use super::assemble::ConvertCx;
use super::convert::anim::{convert_matrices, convert_rotations, convert_scalars};
use super::convert::vec3::{Vec3Mode, convert_vec3s};
use super::error::{ConvertError, ErrorCode};
use super::types::{AnimationData, ChannelData, ChannelProperty, ConvertedStream, Interpolation, SkinData};

/// Identity matrix used when a skin declares no inverse bind matrices.
const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Convert all skins, retaining their matrix streams.
pub(crate) fn convert_skins(
    cx: &ConvertCx<'_>,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Vec<SkinData> {
    let mut skins = Vec::new();

    for skin in cx.document.skins() {
        let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();

        let inverse_bind_matrices = match skin.inverse_bind_matrices() {
            Some(acc) => match retain_matrices(cx, &acc, streams) {
                Ok(matrices) => matrices,
                Err(e) => {
                    log::error!("skin {}: {e}", skin.index());
                    vec![IDENTITY; joints.len()]
                }
            },
            None => vec![IDENTITY; joints.len()],
        };

        skins.push(SkinData {
            name: skin.name().map(String::from),
            joints,
            inverse_bind_matrices,
            skeleton: skin.skeleton().map(|n| n.index()),
        });
    }

    skins
}

fn retain_matrices(
    cx: &ConvertCx<'_>,
    acc: &Accessor<'_>,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Result<Vec<[f32; 16]>, ConvertError> {
    if let Some(ConvertedStream::Matrices(existing)) = streams.get(&acc.index()) {
        return Ok(existing.clone());
    }
    let (src, stride) = require_bytes(cx, acc)?;
    let matrices = convert_matrices(acc.data_type(), src, stride, acc.count())?;
    streams.insert(acc.index(), ConvertedStream::Matrices(matrices.clone()));
    Ok(matrices)
}

/// Convert all animation clips, retaining their key streams.
pub(crate) fn convert_animations(
    cx: &ConvertCx<'_>,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Vec<AnimationData> {
    let mut animations = Vec::new();

    for animation in cx.document.animations() {
        let mut channels = Vec::new();

        for channel in animation.channels() {
            let sampler = channel.sampler();
            let input = sampler.input();
            let output = sampler.output();
            let property = match channel.target().property() {
                gltf_dep::animation::Property::Translation => ChannelProperty::Translation,
                gltf_dep::animation::Property::Rotation => ChannelProperty::Rotation,
                gltf_dep::animation::Property::Scale => ChannelProperty::Scale,
                gltf_dep::animation::Property::MorphTargetWeights => ChannelProperty::MorphWeights,
            };

            let converted = retain_scalars(cx, &input, streams)
                .and_then(|_| retain_channel_output(cx, &output, property, streams));
            if let Err(e) = converted {
                log::error!(
                    "animation {:?} channel targeting node {}: {e}",
                    animation.name(),
                    channel.target().node().index()
                );
                continue;
            }

            channels.push(ChannelData {
                target_node: channel.target().node().index(),
                property,
                interpolation: match sampler.interpolation() {
                    gltf_dep::animation::Interpolation::Linear => Interpolation::Linear,
                    gltf_dep::animation::Interpolation::Step => Interpolation::Step,
                    gltf_dep::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
                },
                input: input.index(),
                output: output.index(),
            });
        }

        animations.push(AnimationData {
            name: animation.name().map(String::from),
            channels,
        });
    }

    animations
}

/// Convert caller-supplied GPU-instancing transform accessor triples.
///
/// The `EXT_mesh_gpu_instancing` JSON side is a collaborator concern; the
/// caller hands over the accessor indices it found and the importer runs
/// the same TRS kernels the animation path uses.
pub(crate) fn convert_instance_transforms(
    cx: &ConvertCx<'_>,
    streams: &mut HashMap<usize, ConvertedStream>,
) {
    for set in &cx.settings.instance_transforms {
        if let Some(acc_index) = set.translation
            && let Err(e) = retain_vec3s(cx, acc_index, Vec3Mode::Position, streams)
        {
            log::error!("instance translation accessor {acc_index}: {e}");
        }
        if let Some(acc_index) = set.rotation
            && let Err(e) = retain_rotations(cx, acc_index, streams)
        {
            log::error!("instance rotation accessor {acc_index}: {e}");
        }
        if let Some(acc_index) = set.scale
            && let Err(e) = retain_vec3s(cx, acc_index, Vec3Mode::Scale, streams)
        {
            log::error!("instance scale accessor {acc_index}: {e}");
        }
    }
}

fn retain_scalars(
    cx: &ConvertCx<'_>,
    acc: &Accessor<'_>,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Result<(), ConvertError> {
    if streams.contains_key(&acc.index()) {
        return Ok(());
    }
    let (src, stride) = require_bytes(cx, acc)?;
    let scalars = convert_scalars(acc.data_type(), acc.normalized(), src, stride, acc.count())?;
    streams.insert(acc.index(), ConvertedStream::Scalars(scalars));
    Ok(())
}

fn retain_channel_output(
    cx: &ConvertCx<'_>,
    acc: &Accessor<'_>,
    property: ChannelProperty,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Result<(), ConvertError> {
    if streams.contains_key(&acc.index()) {
        return Ok(());
    }
    let stream = match property {
        ChannelProperty::Translation => {
            let (src, stride) = require_bytes(cx, acc)?;
            ConvertedStream::Vectors(convert_vec3s(
                Vec3Mode::Position,
                acc.data_type(),
                acc.normalized(),
                src,
                stride,
                acc.count(),
            )?)
        }
        ChannelProperty::Scale => {
            let (src, stride) = require_bytes(cx, acc)?;
            ConvertedStream::Vectors(convert_vec3s(
                Vec3Mode::Scale,
                acc.data_type(),
                acc.normalized(),
                src,
                stride,
                acc.count(),
            )?)
        }
        ChannelProperty::Rotation => {
            let (src, stride) = require_bytes(cx, acc)?;
            ConvertedStream::Rotations(convert_rotations(
                acc.data_type(),
                src,
                stride,
                acc.count(),
            )?)
        }
        ChannelProperty::MorphWeights => {
            let (src, stride) = require_bytes(cx, acc)?;
            ConvertedStream::Scalars(convert_scalars(
                acc.data_type(),
                acc.normalized(),
                src,
                stride,
                acc.count(),
            )?)
        }
    };
    streams.insert(acc.index(), stream);
    Ok(())
}

fn retain_vec3s(
    cx: &ConvertCx<'_>,
    acc_index: usize,
    mode: Vec3Mode,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Result<(), ConvertError> {
    if streams.contains_key(&acc_index) {
        return Ok(());
    }
    let acc = cx.accessor(acc_index)?;
    let (src, stride) = require_bytes(cx, acc)?;
    let vectors = convert_vec3s(mode, acc.data_type(), acc.normalized(), src, stride, acc.count())?;
    streams.insert(acc_index, ConvertedStream::Vectors(vectors));
    Ok(())
}

fn retain_rotations(
    cx: &ConvertCx<'_>,
    acc_index: usize,
    streams: &mut HashMap<usize, ConvertedStream>,
) -> Result<(), ConvertError> {
    if streams.contains_key(&acc_index) {
        return Ok(());
    }
    let acc = cx.accessor(acc_index)?;
    let (src, stride) = require_bytes(cx, acc)?;
    let rotations = convert_rotations(acc.data_type(), src, stride, acc.count())?;
    streams.insert(acc_index, ConvertedStream::Rotations(rotations));
    Ok(())
}

fn require_bytes<'a>(
    cx: &ConvertCx<'a>,
    acc: &Accessor<'_>,
) -> Result<(&'a [u8], usize), ConvertError> {
    if acc.sparse().is_some() {
        log::warn!(
            "[{}] sparse override on retained stream accessor {} ignored",
            ErrorCode::SparseUnsupportedRole,
            acc.index()
        );
    }
    resolve_bytes(acc, cx.buffers)?.ok_or_else(|| {
        ConvertError::new(
            ErrorCode::TruncatedData,
            format!("accessor {} has no buffer view", acc.index()),
        )
    })
}

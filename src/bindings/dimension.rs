//! Commands of the three dimension descriptors.

use crate::error::Result;
use crate::ffi::HostValue;
use crate::registry::Registry;
use crate::store::{RangeDimension, SampledDimension, SetDimension};
use crate::structs::StructBuilder;

fn describe_set(dim: &SetDimension) -> Result<HostValue> {
    let mut sb = StructBuilder::new(&[1], &["dimensionType", "labels"]);
    sb.set("set").set(dim.labels()?);
    sb.array()
}

fn describe_sampled(dim: &SampledDimension) -> Result<HostValue> {
    let mut sb = StructBuilder::new(
        &[1],
        &["dimensionType", "label", "unit", "samplingInterval", "offset"],
    );
    sb.set("sample")
        .set(dim.label()?)
        .set(dim.unit()?)
        .set(dim.sampling_interval()?)
        .set(dim.offset()?);
    sb.array()
}

fn describe_range(dim: &RangeDimension) -> Result<HostValue> {
    let mut sb = StructBuilder::new(&[1], &["dimensionType", "label", "unit", "ticks"]);
    sb.set("range")
        .set(dim.label()?)
        .set(dim.unit()?)
        .set(dim.ticks()?);
    sb.array()
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry
        .classdef::<SetDimension>("SetDimension")
        .desc(describe_set)
        .opt_setter("labels", |d: &SetDimension, labels: Option<Vec<String>>| {
            d.set_labels(labels)
        })
        .finish()?;

    registry
        .classdef::<SampledDimension>("SampledDimension")
        .desc(describe_sampled)
        .opt_setter("label", |d: &SampledDimension, l: Option<String>| {
            d.set_label(l)
        })
        .opt_setter("unit", |d: &SampledDimension, u: Option<String>| {
            d.set_unit(u)
        })
        .setter("set_samplingInterval", |d: &SampledDimension, v: f64| {
            d.set_sampling_interval(v)
        })
        .opt_setter("offset", |d: &SampledDimension, v: Option<f64>| {
            d.set_offset(v)
        })
        .method1("index_of", |d: &SampledDimension, position: f64| {
            d.index_of(position)
        })
        .method1("position_at", |d: &SampledDimension, index: usize| {
            d.position_at(index)
        })
        .method2(
            "axis",
            |d: &SampledDimension, count: usize, start: Option<usize>| {
                d.axis(count, start.unwrap_or(0))
            },
        )
        .finish()?;

    registry
        .classdef::<RangeDimension>("RangeDimension")
        .desc(describe_range)
        .opt_setter("label", |d: &RangeDimension, l: Option<String>| d.set_label(l))
        .opt_setter("unit", |d: &RangeDimension, u: Option<String>| d.set_unit(u))
        .setter("set_ticks", |d: &RangeDimension, ticks: Vec<f64>| {
            d.set_ticks(ticks)
        })
        .method1("index_of", |d: &RangeDimension, position: f64| {
            d.index_of(position)
        })
        .method1("tick_at", |d: &RangeDimension, index: usize| d.tick_at(index))
        .method2(
            "axis",
            |d: &RangeDimension, count: usize, start: Option<usize>| {
                d.axis(count, start.unwrap_or(0))
            },
        )
        .finish()
}

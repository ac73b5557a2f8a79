//! Scan orchestration.
//!
//! One pass per target: resolve → enumerate → classify → filter → render.
//! Each target owns its resolution scope, so distinct targets scan in
//! parallel; within one target everything is sequential and deterministic.

use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::classifier::AnnotationContext;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::filter::FilterPipeline;
use crate::kotlin::KotlinProbe;
use crate::render::{self, ClassBlock, MemberLine};
use crate::resolver;
use crate::universe::{self, ClassRecord};

/// Scans every target against the shared classpath. Any failure aborts the
/// whole invocation; nothing is retried.
pub fn scan_all(targets: &[PathBuf], config: &ScanConfig) -> Result<Vec<PathBuf>, ScanError> {
    targets
        .par_iter()
        .map(|target| scan_target(target, config))
        .collect()
}

/// Scans one artifact and writes its API file. Returns the output path.
pub fn scan_target(target: &Path, config: &ScanConfig) -> Result<PathBuf, ScanError> {
    let mut scope = resolver::resolve(target, &config.classpath)?;
    let universe = universe::enumerate(&mut scope, &config.excludes)?;

    let context = AnnotationContext::build(&universe, &config.markers);
    let probe = KotlinProbe::resolve(&universe);
    debug!(
        "language metadata probe for {}: available={}",
        target.display(),
        probe.is_available()
    );

    let pipeline = FilterPipeline::new(
        &universe,
        &context,
        &probe,
        &config.markers,
        &config.method_excludes,
    );

    let mut content = String::new();
    for record in universe.classes() {
        if !pipeline.include_class(record)? {
            continue;
        }
        let block = build_block(&pipeline, record);
        content.push_str(&render::render_block(&block));
    }

    let output = render::output_path(&config.output_dir, target);
    render::write_atomic(&output, &content)?;
    info!("API file: {}", output.display());
    Ok(output)
}

fn build_block<'a>(pipeline: &FilterPipeline<'_>, record: &'a ClassRecord) -> ClassBlock<'a> {
    let mut methods: Vec<&'a _> = record
        .methods
        .iter()
        .filter(|m| pipeline.include_method(record, m))
        .collect();
    methods.sort_by(|a, b| render::member_order(a, b));

    let mut fields: Vec<&'a _> = record
        .fields
        .iter()
        .filter(|f| pipeline.include_field(f))
        .collect();
    fields.sort_by(|a, b| render::member_order(a, b));

    ClassBlock {
        record,
        annotations: pipeline.class_annotations(record),
        methods: methods
            .into_iter()
            .map(|member| MemberLine {
                member,
                annotations: pipeline.member_annotations(member),
            })
            .collect(),
        fields: fields
            .into_iter()
            .map(|member| MemberLine {
                member,
                annotations: pipeline.member_annotations(member),
            })
            .collect(),
    }
}

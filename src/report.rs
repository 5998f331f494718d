//! Report envelope and plain-text rendering of index results.

use serde::Serialize;

use crate::conflict::{BalanceSummary, MagnitudeBalanceResult, TriangleConflictResult};
use crate::dilemma::{ConstructClass, DilemmaResult, OrientedConstruct};
use crate::grid::{trim_label, Grid, GridAccessor};
use crate::intensity::IntensityResult;

/// One computed index.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "index", content = "result", rename_all = "snake_case")]
pub enum IndexReport {
    Bias(f64),
    Variability(f64),
    Pvaff(f64),
    Intensity(IntensityResult),
    SignBalance(BalanceSummary),
    MagnitudeBalance(MagnitudeBalanceResult),
    Triangle(TriangleConflictResult),
    Dilemma(DilemmaResult),
}

impl IndexReport {
    pub fn title(&self) -> &'static str {
        match self {
            IndexReport::Bias(_) => "Bias",
            IndexReport::Variability(_) => "Variability",
            IndexReport::Pvaff(_) => "PVAFF",
            IndexReport::Intensity(_) => "Intensity",
            IndexReport::SignBalance(_) => "Conflict (sign balance of triads)",
            IndexReport::MagnitudeBalance(_) => "Conflict (magnitude balance of triads)",
            IndexReport::Triangle(_) => "Conflict (triangle inequality)",
            IndexReport::Dilemma(_) => "Implicative dilemmas",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEnvelope {
    /// blake3 of the grid's canonical JSON form.
    pub grid_hash: String,
    pub constructs: usize,
    pub elements: usize,
    pub reports: Vec<IndexReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub digits: u32,
    pub trim: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            digits: crate::config::DEFAULT_DIGITS,
            trim: Some(20),
        }
    }
}

pub fn build_envelope(grid: &Grid, reports: Vec<IndexReport>) -> ReportEnvelope {
    ReportEnvelope {
        grid_hash: grid_fingerprint(grid),
        constructs: grid.construct_count(),
        elements: grid.element_count(),
        reports,
    }
}

pub fn grid_fingerprint(grid: &Grid) -> String {
    let bytes = serde_json::to_vec(&grid.to_spec()).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

fn num(value: f64, digits: u32) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.*}", digits as usize, value)
    }
}

fn construct_name(labels: &[(String, String)], c: usize) -> String {
    labels
        .get(c)
        .map(|(l, r)| format!("{l} - {r}"))
        .unwrap_or_else(|| format!("#{c}"))
}

fn element_name(labels: &[String], e: usize) -> String {
    labels.get(e).cloned().unwrap_or_else(|| format!("#{e}"))
}

pub fn render_envelope_text<G: GridAccessor + ?Sized>(
    envelope: &ReportEnvelope,
    grid: &G,
    opts: &RenderOptions,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Grid fingerprint: {}\n", envelope.grid_hash));
    out.push_str(&format!(
        "Constructs: {}, elements: {}\n",
        envelope.constructs, envelope.elements
    ));
    for report in &envelope.reports {
        out.push('\n');
        out.push_str(&render_report_text(report, grid, opts));
    }
    out
}

pub fn render_report_text<G: GridAccessor + ?Sized>(
    report: &IndexReport,
    grid: &G,
    opts: &RenderOptions,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("## {}\n\n", report.title()));
    let d = opts.digits;
    match report {
        IndexReport::Bias(v) | IndexReport::Variability(v) | IndexReport::Pvaff(v) => {
            out.push_str(&format!("{}\n", num(*v, d)));
        }
        IndexReport::Intensity(r) => render_intensity(&mut out, r, grid, opts),
        IndexReport::SignBalance(s) => render_balance(&mut out, s, d),
        IndexReport::MagnitudeBalance(r) => {
            render_balance(&mut out, &r.summary, d);
            out.push_str(&format!("Tolerance (crit): {}\n", r.crit));
            if !r.imbalanced_triads.is_empty() {
                out.push_str("\nImbalanced triads (constructs: z_ab z_ac z_bc)\n");
                for t in &r.imbalanced_triads {
                    let [a, b, c] = t.constructs;
                    out.push_str(&format!(
                        "- {} {} {}: {} {} {}\n",
                        a,
                        b,
                        c,
                        num(t.z[0], d),
                        num(t.z[1], d),
                        num(t.z[2], d)
                    ));
                }
            }
        }
        IndexReport::Triangle(r) => render_triangle(&mut out, r, grid, opts),
        IndexReport::Dilemma(r) => render_dilemma(&mut out, r, grid, opts),
    }
    out
}

fn render_intensity<G: GridAccessor + ?Sized>(
    out: &mut String,
    r: &IntensityResult,
    grid: &G,
    opts: &RenderOptions,
) {
    let d = opts.digits;
    let constructs = grid.construct_labels(opts.trim);
    let elements = grid.element_labels(opts.trim);
    out.push_str("Constructs\n");
    for (c, v) in r.per_construct.iter().enumerate() {
        out.push_str(&format!(
            "- {}: {}\n",
            construct_name(&constructs, c),
            num(*v, d)
        ));
    }
    out.push_str("\nElements\n");
    for (e, v) in r.per_element.iter().enumerate() {
        out.push_str(&format!("- {}: {}\n", element_name(&elements, e), num(*v, d)));
    }
    out.push_str(&format!(
        "\nMean construct intensity: {}\nMean element intensity: {}\nTotal intensity: {}\n",
        num(r.construct_mean, d),
        num(r.element_mean, d),
        num(r.total, d)
    ));
}

fn render_balance(out: &mut String, s: &BalanceSummary, digits: u32) {
    out.push_str(&format!("Triads: {}\n", s.total));
    out.push_str(&format!(
        "Balanced/imbalanced: {}/{} ({} imbalanced with undefined correlations)\n",
        s.balanced, s.imbalanced, s.undefined
    ));
    out.push_str(&format!(
        "Proportion balanced: {}\nProportion imbalanced: {}\n",
        num(s.prop_balanced, digits),
        num(s.prop_imbalanced, digits)
    ));
}

fn render_triangle<G: GridAccessor + ?Sized>(
    out: &mut String,
    r: &TriangleConflictResult,
    grid: &G,
    opts: &RenderOptions,
) {
    let d = opts.digits;
    let constructs = grid.construct_labels(opts.trim);
    let elements = grid.element_labels(opts.trim);
    out.push_str(&format!("Distance power: {}\n", r.power));
    out.push_str(&format!(
        "Conflicts: {} of {} potential ({}%)\n",
        r.actual,
        r.potential,
        num(r.overall_percent, d)
    ));

    out.push_str("\nBy element\n");
    for a in &r.per_element {
        out.push_str(&format!(
            "- {}: {} ({}%)\n",
            element_name(&elements, a.index),
            a.count,
            num(a.percent, d)
        ));
    }
    out.push_str("\nBy construct\n");
    for a in &r.per_construct {
        out.push_str(&format!(
            "- {}: {} ({}%)\n",
            construct_name(&constructs, a.index),
            a.count,
            num(a.percent, d)
        ));
    }

    for detail in &r.element_details {
        out.push_str(&format!(
            "\nElement {}: {} conflicts, discrepancy mean {} sd {}\n",
            element_name(&elements, detail.element),
            detail.conflicts,
            num(detail.discrepancy_mean, d),
            num(detail.discrepancy_sd, d)
        ));
        for share in detail.constructs.iter().filter(|s| s.count > 0) {
            out.push_str(&format!(
                "  - {}: {} ({}%)\n",
                construct_name(&constructs, share.index),
                share.count,
                num(share.percent, d)
            ));
        }
    }
    for detail in &r.construct_details {
        out.push_str(&format!(
            "\nConstruct {}: {} conflicts, discrepancy mean {} sd {}\n",
            construct_name(&constructs, detail.construct),
            detail.conflicts,
            num(detail.discrepancy_mean, d),
            num(detail.discrepancy_sd, d)
        ));
        for share in detail.elements.iter().filter(|s| s.count > 0) {
            out.push_str(&format!(
                "  - element {}: {} ({}%)\n",
                element_name(&elements, share.index),
                share.count,
                num(share.percent, d)
            ));
        }
        for share in detail.constructs.iter().filter(|s| s.count > 0) {
            out.push_str(&format!(
                "  - with {}: {} ({}%)\n",
                construct_name(&constructs, share.index),
                share.count,
                num(share.percent, d)
            ));
        }
    }
}

fn class_label(class: ConstructClass) -> &'static str {
    match class {
        ConstructClass::Congruent => "congruent",
        ConstructClass::Discrepant => "discrepant",
        ConstructClass::Neither => "neither",
    }
}

fn oriented_label(c: &OrientedConstruct, trim: Option<usize>) -> String {
    let marker = if c.inverted { " (inverted)" } else { "" };
    format!(
        "{} - {}{}",
        trim_label(&c.left, trim),
        trim_label(&c.right, trim),
        marker
    )
}

fn render_dilemma<G: GridAccessor + ?Sized>(
    out: &mut String,
    r: &DilemmaResult,
    grid: &G,
    opts: &RenderOptions,
) {
    let d = opts.digits;
    let constructs = grid.construct_labels(opts.trim);
    let elements = grid.element_labels(opts.trim);
    out.push_str(&format!(
        "Self: {}, ideal: {}, midpoint {}\n",
        element_name(&elements, r.self_element),
        element_name(&elements, r.ideal_element),
        r.midpoint
    ));
    out.push_str(&format!(
        "Mode {} (congruent <= {}, discrepant >= {}), r_min {}, criterion {:?}\n",
        r.mode.selector(),
        r.thresholds.congruent,
        r.thresholds.discrepant,
        r.r_min,
        r.basis
    ));

    out.push_str("\nConstructs (self / ideal / difference / class)\n");
    for a in &r.constructs {
        out.push_str(&format!(
            "- {}: {} / {} / {} / {}\n",
            construct_name(&constructs, a.index),
            a.self_rating,
            a.ideal_rating,
            a.difference,
            class_label(a.class)
        ));
    }

    out.push_str("\nCandidate pairs (r including / r excluding)\n");
    for c in &r.candidates {
        let excluding = c.r_excluding.map_or_else(|| "-".to_string(), |v| num(v, d));
        out.push_str(&format!(
            "- {} x {} [{:?}]: {} / {}{}\n",
            c.first,
            c.second,
            c.orientation,
            num(c.r_including, d),
            excluding,
            if c.qualifies { " *" } else { "" }
        ));
    }

    out.push_str(&format!(
        "\nDilemmas: {} (congruent {}, discrepant {}, PID {}%)\n",
        r.dilemmas.len(),
        r.congruent_count,
        r.discrepant_count,
        num(r.pid_percent, d)
    ));
    for p in &r.dilemmas {
        let excluding = p.r_excluding.map_or_else(|| "-".to_string(), |v| num(v, d));
        out.push_str(&format!(
            "- {} <> {} (r {} / {})\n",
            oriented_label(&p.congruent, opts.trim),
            oriented_label(&p.discrepant, opts.trim),
            num(p.r_including, d),
            excluding
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Construct, Element, Scale};

    fn grid() -> Grid {
        Grid::from_rows(
            Scale::new(1.0, 5.0).unwrap(),
            vec![
                Construct::new("friendly", "hostile"),
                Construct::new("calm", "anxious"),
            ],
            vec![Element::new("self"), Element::new("mother"), Element::new("ideal")],
            &[vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 5.0]],
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let g = grid();
        assert_eq!(grid_fingerprint(&g), grid_fingerprint(&grid()));
        let other = Grid::from_rows(
            Scale::new(1.0, 5.0).unwrap(),
            g.constructs().to_vec(),
            g.elements().to_vec(),
            &[vec![1.0, 3.0, 4.0], vec![2.0, 4.0, 5.0]],
        )
        .unwrap();
        assert_ne!(grid_fingerprint(&g), grid_fingerprint(&other));
    }

    #[test]
    fn scalar_report_renders_with_digits_and_na() {
        let g = grid();
        let opts = RenderOptions {
            digits: 3,
            trim: None,
        };
        let text = render_report_text(&IndexReport::Bias(0.123456), &g, &opts);
        assert!(text.contains("## Bias"));
        assert!(text.contains("0.123"));
        let text = render_report_text(&IndexReport::Pvaff(f64::NAN), &g, &opts);
        assert!(text.contains("NA"));
    }

    #[test]
    fn json_report_is_tagged_by_index() {
        let value = serde_json::to_value(IndexReport::Variability(0.25)).unwrap();
        assert_eq!(value["index"], "variability");
        assert_eq!(value["result"], 0.25);
    }

    #[test]
    fn envelope_lists_every_report() {
        let g = grid();
        let env = build_envelope(&g, vec![IndexReport::Bias(0.1), IndexReport::Pvaff(0.9)]);
        assert_eq!(env.constructs, 2);
        assert_eq!(env.elements, 3);
        let text = render_envelope_text(&env, &g, &RenderOptions::default());
        assert!(text.contains(&env.grid_hash));
        assert!(text.contains("## Bias") && text.contains("## PVAFF"));
    }
}

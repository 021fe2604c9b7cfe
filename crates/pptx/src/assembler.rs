//! Deck assembly: walking a slide plan in order and populating a base
//! document with one slide part per record.

use crate::layout::{self, LayoutInfo};
use crate::package::{
    part_as_str, max_rel_id, rels_path_for, rewrite_content_types, rewrite_presentation,
    rewrite_relationships, BasePackage, Relationship, CONTENT_TYPES_PATH, PRESENTATION_PATH,
    PRESENTATION_RELS_PATH, SLIDE_CONTENT_TYPE, SLIDE_REL_TYPE,
};
use crate::writer::RenderedDeck;
use crate::xmlutil::escape_text;
use deck_core::{LayoutRole, Result, SlidePlan, SlideRecord, Typography};

/// First slide id; ids count up from here in plan order.
const FIRST_SLIDE_ID: u32 = 256;

const SLIDE_XMLNS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// Assembles a [`SlidePlan`] into a [`RenderedDeck`].
///
/// The typography policy is configurable; the default mirrors the common
/// presentation defaults (large title, autofit body).
#[derive(Debug, Clone)]
pub struct DeckAssembler {
    typography: Typography,
}

impl DeckAssembler {
    /// Create an assembler with the default typography policy.
    pub fn new() -> Self {
        Self {
            typography: Typography::default(),
        }
    }

    /// Replace the typography policy.
    pub fn with_typography(mut self, typography: Typography) -> Self {
        self.typography = typography;
        self
    }

    /// Assemble the plan against a base document.
    ///
    /// A template base first has every pre-existing slide stripped; the
    /// plan's records then become the deck's slides, in plan order. The
    /// base is consumed: each assembly needs a freshly opened base.
    pub fn assemble(&self, plan: &SlidePlan, mut base: BasePackage) -> Result<RenderedDeck> {
        base.strip_slides()?;

        let pres_rels = part_as_str(&base.parts, PRESENTATION_RELS_PATH)?;
        let mut next_rel = max_rel_id(pres_rels)? + 1;

        let mut rel_additions = Vec::with_capacity(plan.len());
        let mut override_additions = Vec::with_capacity(plan.len());
        let mut slide_entries = Vec::with_capacity(plan.len());

        for (position, record) in plan.iter().enumerate() {
            let role = LayoutRole::for_position(position);
            let chosen = layout::resolve(&base.layouts, role);

            let number = position + 1;
            let slide_path = format!("ppt/slides/slide{}.xml", number);
            let slide_xml = self.slide_xml(record, role, chosen);
            let rels_xml = slide_rels_xml(&chosen.path);

            base.parts
                .insert(rels_path_for(&slide_path), rels_xml.into_bytes());
            base.parts
                .insert(slide_path.clone(), slide_xml.into_bytes());

            override_additions.push((slide_path, SLIDE_CONTENT_TYPE.to_string()));

            let rel_id = format!("rId{}", next_rel);
            next_rel += 1;
            rel_additions.push(Relationship {
                id: rel_id.clone(),
                rel_type: SLIDE_REL_TYPE.to_string(),
                target: format!("slides/slide{}.xml", number),
            });
            slide_entries.push((FIRST_SLIDE_ID + position as u32, rel_id));
        }

        let content_types = part_as_str(&base.parts, CONTENT_TYPES_PATH)?;
        let rewritten = rewrite_content_types(content_types, false, &override_additions)?;
        base.parts
            .insert(CONTENT_TYPES_PATH.to_string(), rewritten.into_bytes());

        let pres_rels = part_as_str(&base.parts, PRESENTATION_RELS_PATH)?;
        let rewritten = rewrite_relationships(pres_rels, false, &rel_additions)?;
        base.parts
            .insert(PRESENTATION_RELS_PATH.to_string(), rewritten.into_bytes());

        let presentation = part_as_str(&base.parts, PRESENTATION_PATH)?;
        let rewritten = rewrite_presentation(presentation, &slide_entries)?;
        base.parts
            .insert(PRESENTATION_PATH.to_string(), rewritten.into_bytes());

        log::debug!("assembled deck with {} slides", plan.len());

        Ok(RenderedDeck {
            parts: base.parts,
            slide_count: plan.len(),
        })
    }

    /// Generate one slide part.
    fn slide_xml(&self, record: &SlideRecord, role: LayoutRole, chosen: &LayoutInfo) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(&format!("<p:sld {}>", SLIDE_XMLNS));
        xml.push_str("<p:cSld><p:spTree>");
        xml.push_str(
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
        );

        self.push_title_shape(&mut xml, &record.title, role);

        match role {
            LayoutRole::Title => {
                if let Some(subtitle) = record.subtitle() {
                    if chosen.has_body_placeholder {
                        self.push_subtitle_shape(&mut xml, &subtitle);
                    } else {
                        log::warn!(
                            "layout {:?} has no subtitle placeholder; skipping subtitle",
                            chosen.name
                        );
                    }
                }
            }
            LayoutRole::Content => {
                if chosen.has_body_placeholder {
                    self.push_body_shape(&mut xml, &record.bullets());
                } else if !record.bullets().is_empty() {
                    log::warn!(
                        "layout {:?} has no body placeholder; skipping {} bullets",
                        chosen.name,
                        record.bullets().len()
                    );
                }
            }
        }

        xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
        xml
    }

    fn push_title_shape(&self, xml: &mut String, title: &str, role: LayoutRole) {
        let ph_type = match role {
            LayoutRole::Title => "ctrTitle",
            LayoutRole::Content => "title",
        };
        xml.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="{}"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p>{}</a:p></p:txBody></p:sp>"#,
            ph_type,
            run(title, self.typography.title_size),
        ));
    }

    fn push_subtitle_shape(&self, xml: &mut String, subtitle: &str) {
        xml.push_str(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Subtitle 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>"#,
        );
        for line in subtitle.lines() {
            xml.push_str(&format!("<a:p>{}</a:p>", run(line, self.typography.body_size)));
        }
        xml.push_str("</p:txBody></p:sp>");
    }

    /// Body placeholder: one level-0 paragraph per bullet, in source order.
    /// Emitted even when there are no bullets, so the placeholder is
    /// present but empty rather than omitted.
    fn push_body_shape(&self, xml: &mut String, bullets: &[&str]) {
        let body_pr = if self.typography.autofit_body {
            "<a:bodyPr><a:normAutofit/></a:bodyPr>"
        } else {
            "<a:bodyPr/>"
        };
        xml.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody>{}<a:lstStyle/>"#,
            body_pr,
        ));
        if bullets.is_empty() {
            xml.push_str(r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#);
        } else {
            for bullet in bullets {
                xml.push_str(&format!(
                    r#"<a:p><a:pPr lvl="0"/>{}</a:p>"#,
                    run(bullet, self.typography.body_size),
                ));
            }
        }
        xml.push_str("</p:txBody></p:sp>");
    }
}

impl Default for DeckAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// A text run, sized in hundredths of a point when a size is configured.
fn run(text: &str, size: Option<u32>) -> String {
    match size {
        Some(points) => format!(
            r#"<a:r><a:rPr lang="en-US" sz="{}"/><a:t>{}</a:t></a:r>"#,
            points * 100,
            escape_text(text),
        ),
        None => format!("<a:r><a:t>{}</a:t></a:r>", escape_text(text)),
    }
}

/// Relationships part for one slide: a single link to its layout.
fn slide_rels_xml(layout_path: &str) -> String {
    let target = format!(
        "../{}",
        layout_path.strip_prefix("ppt/").unwrap_or(layout_path)
    );
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}" Target="{}"/></Relationships>"#,
        crate::package::LAYOUT_REL_TYPE,
        target,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::part_as_str;
    use deck_core::markdown;
    use std::io::Cursor;

    const SCENARIO: &str = "# Slide 1: Intro\n## A subtitle\n---\n# Slide 2: Point One\n- bullet A\n- bullet B\n**Speaker Notes:** talk about A";

    fn scenario_plan() -> SlidePlan {
        markdown::parse(SCENARIO).unwrap()
    }

    #[test]
    fn test_assemble_blank_two_slide_scenario() {
        let deck = DeckAssembler::new()
            .assemble(&scenario_plan(), BasePackage::blank())
            .unwrap();

        assert_eq!(deck.slide_count(), 2);
        assert!(deck.has_part("ppt/slides/slide1.xml"));
        assert!(deck.has_part("ppt/slides/slide2.xml"));
        assert!(deck.has_part("ppt/slides/_rels/slide1.xml.rels"));

        let slide1 = part_as_str(&deck.parts, "ppt/slides/slide1.xml").unwrap();
        assert!(slide1.contains(r#"type="ctrTitle""#));
        assert!(slide1.contains("<a:t>Intro</a:t>"));
        assert!(slide1.contains("<a:t>A subtitle</a:t>"));

        let slide2 = part_as_str(&deck.parts, "ppt/slides/slide2.xml").unwrap();
        assert!(slide2.contains(r#"type="title""#));
        assert!(slide2.contains("<a:t>Point One</a:t>"));
        assert!(slide2.contains("<a:t>bullet A</a:t>"));
        assert!(slide2.contains("<a:t>bullet B</a:t>"));
        // Annotation lines never render as bullets.
        assert!(!slide2.contains("talk about A"));
    }

    #[test]
    fn test_assemble_registers_slides_everywhere() {
        let deck = DeckAssembler::new()
            .assemble(&scenario_plan(), BasePackage::blank())
            .unwrap();

        let content_types = part_as_str(&deck.parts, CONTENT_TYPES_PATH).unwrap();
        assert!(content_types.contains("/ppt/slides/slide1.xml"));
        assert!(content_types.contains("/ppt/slides/slide2.xml"));

        let rels = part_as_str(&deck.parts, PRESENTATION_RELS_PATH).unwrap();
        assert!(rels.contains("slides/slide1.xml"));
        assert!(rels.contains("slides/slide2.xml"));

        let presentation = part_as_str(&deck.parts, PRESENTATION_PATH).unwrap();
        assert!(presentation.contains(r#"<p:sldId id="256""#));
        assert!(presentation.contains(r#"<p:sldId id="257""#));
        let first = presentation.find(r#"id="256""#).unwrap();
        let second = presentation.find(r#"id="257""#).unwrap();
        assert!(first < second, "plan order must be deck order");
    }

    #[test]
    fn test_title_only_content_slide_keeps_empty_body() {
        let plan = markdown::parse("# Opener\n---\n# Just a Title").unwrap();
        let deck = DeckAssembler::new()
            .assemble(&plan, BasePackage::blank())
            .unwrap();

        let slide2 = part_as_str(&deck.parts, "ppt/slides/slide2.xml").unwrap();
        // Body placeholder present but empty, not omitted.
        assert!(slide2.contains(r#"<p:ph idx="1"/>"#));
        assert!(slide2.contains("endParaRPr"));
    }

    #[test]
    fn test_typography_default_and_none() {
        let plan = scenario_plan();

        let styled = DeckAssembler::new()
            .assemble(&plan, BasePackage::blank())
            .unwrap();
        let slide1 = part_as_str(&styled.parts, "ppt/slides/slide1.xml").unwrap();
        let slide2 = part_as_str(&styled.parts, "ppt/slides/slide2.xml").unwrap();
        assert!(slide1.contains(r#"sz="4400""#));
        assert!(slide2.contains(r#"sz="2400""#));
        assert!(slide2.contains("normAutofit"));

        let plain = DeckAssembler::new()
            .with_typography(Typography::none())
            .assemble(&plan, BasePackage::blank())
            .unwrap();
        let slide1 = part_as_str(&plain.parts, "ppt/slides/slide1.xml").unwrap();
        let slide2 = part_as_str(&plain.parts, "ppt/slides/slide2.xml").unwrap();
        assert!(!slide1.contains("sz="));
        assert!(!slide2.contains("normAutofit"));
    }

    #[test]
    fn test_bullet_text_is_escaped() {
        let plan = markdown::parse("# T\n---\n# C\n- a < b & c").unwrap();
        let deck = DeckAssembler::new()
            .assemble(&plan, BasePackage::blank())
            .unwrap();
        let slide2 = part_as_str(&deck.parts, "ppt/slides/slide2.xml").unwrap();
        assert!(slide2.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_template_round_trip_strips_old_slides() {
        // First deck becomes the template for the second.
        let first = DeckAssembler::new()
            .assemble(&scenario_plan(), BasePackage::blank())
            .unwrap();
        let template_bytes = first.into_bytes().unwrap();

        let base = BasePackage::from_template(Cursor::new(template_bytes)).unwrap();
        assert_eq!(base.slides.len(), 2);
        assert_eq!(base.layouts.len(), 2);
        assert_eq!(base.layouts[0].name, "Title Slide");

        let new_plan = markdown::parse("# Fresh Deck\n---\n# One\n- a\n---\n# Two\n- b").unwrap();
        let second = DeckAssembler::new().assemble(&new_plan, base).unwrap();

        // Final slide count equals the new plan's length, not the template's.
        assert_eq!(second.slide_count(), 3);
        assert!(second.has_part("ppt/slides/slide3.xml"));
        let slide1 = part_as_str(&second.parts, "ppt/slides/slide1.xml").unwrap();
        assert!(slide1.contains("Fresh Deck"));
        assert!(!slide1.contains("Intro"));

        let presentation = part_as_str(&second.parts, PRESENTATION_PATH).unwrap();
        assert_eq!(presentation.matches("<p:sldId ").count(), 3);
    }

    #[test]
    fn test_slide_rels_point_at_resolved_layout() {
        let deck = DeckAssembler::new()
            .assemble(&scenario_plan(), BasePackage::blank())
            .unwrap();
        let rels1 = part_as_str(&deck.parts, "ppt/slides/_rels/slide1.xml.rels").unwrap();
        let rels2 = part_as_str(&deck.parts, "ppt/slides/_rels/slide2.xml.rels").unwrap();
        assert!(rels1.contains("../slideLayouts/slideLayout1.xml"));
        assert!(rels2.contains("../slideLayouts/slideLayout2.xml"));
    }
}

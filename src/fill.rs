use crate::error::{FundFormError, lopdf_err};
use crate::font::{StandardFont, measure_text_width, wrap_text};
use crate::mapping::presentation_values;
use crate::normalize::to_yes_no;
use crate::pdf::{encode_winansi_pdf_string, fmt};
use crate::record::ApplicationRecord;
use crate::types::Pt;
use lopdf::{
    Dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId,
    Stream as LoStream, StringFormat, dictionary,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const FIELD_FLAG_MULTILINE: i64 = 1 << 12;
const FIELD_FLAG_RADIO: i64 = 1 << 15;
const FIELD_FLAG_PUSHBUTTON: i64 = 1 << 16;
const ANNOT_FLAG_HIDDEN: i64 = 1 << 1;
const ANNOT_FLAG_NOVIEW: i64 = 1 << 5;

const APPEARANCE_FONT: &str = "Helv";
const APPEARANCE_PADDING: f32 = 2.0;
const AUTO_FONT_MAX: f32 = 12.0;
const AUTO_FONT_MIN: f32 = 4.0;
const MULTILINE_FONT: f32 = 10.0;
const LINE_SPACING: f32 = 1.15;
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub template_path: Option<PathBuf>,
    pub flatten: bool,
    // Case-insensitive substrings; a template path containing any of them
    // is refused before it is opened.
    pub disallowed_patterns: Vec<String>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            template_path: None,
            flatten: true,
            disallowed_patterns: Vec::new(),
        }
    }
}

impl FillOptions {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: Some(template_path.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub fields_found: usize,
    pub fields_written: usize,
    pub fields_skipped: usize,
    pub widgets_flattened: usize,
}

pub fn fill_template(
    record: &ApplicationRecord,
    options: &FillOptions,
) -> Result<Vec<u8>, FundFormError> {
    fill_template_with_report(record, options).map(|(bytes, _)| bytes)
}

pub fn fill_template_with_report(
    record: &ApplicationRecord,
    options: &FillOptions,
) -> Result<(Vec<u8>, FillReport), FundFormError> {
    let path = checked_template_path(options)?;
    let bytes = std::fs::read(path)
        .map_err(|err| FundFormError::TemplateUnreadable(path.to_path_buf(), err))?;
    fill_template_bytes(&bytes, record, options.flatten)
}

pub fn checked_template_path(options: &FillOptions) -> Result<&Path, FundFormError> {
    let path = options
        .template_path
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(FundFormError::TemplatePathUnset)?;
    let shown = path.to_string_lossy();
    let lowered = shown.to_lowercase();
    for pattern in &options.disallowed_patterns {
        let pattern = pattern.trim().to_lowercase();
        if !pattern.is_empty() && lowered.contains(&pattern) {
            return Err(FundFormError::TemplateDisallowed(shown.into_owned()));
        }
    }
    Ok(path)
}

pub fn fill_template_bytes(
    template: &[u8],
    record: &ApplicationRecord,
    flatten: bool,
) -> Result<(Vec<u8>, FillReport), FundFormError> {
    let mut doc = LoDocument::load_mem(template).map_err(lopdf_err)?;
    if doc.is_encrypted() {
        return Err(FundFormError::TemplateInvalid(
            "template PDF is encrypted".to_string(),
        ));
    }
    let fields = collect_fields(&doc);
    if fields.is_empty() {
        return Err(FundFormError::NoFillableFields);
    }

    let values = presentation_values(record);
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut report = FillReport {
        fields_found: fields.len(),
        ..FillReport::default()
    };
    for field in &fields {
        let Some(value) = lookup_value(&values, &field.name) else {
            report.fields_skipped += 1;
            continue;
        };
        let written = match field.kind {
            FieldKind::Text | FieldKind::Choice => {
                write_text_field(&mut doc, field, value, font_id)?;
                true
            }
            FieldKind::CheckBox => write_check_box(&mut doc, field, value)?,
            FieldKind::Unsupported => false,
        };
        if written {
            report.fields_written += 1;
        } else {
            report.fields_skipped += 1;
        }
    }

    if flatten {
        report.widgets_flattened = flatten_form(&mut doc)?;
    } else {
        register_form_font(&mut doc, font_id)?;
    }

    doc.prune_objects();
    doc.renumber_objects();
    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|err| FundFormError::Serialization(err.to_string()))?;
    Ok((out, report))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Choice,
    CheckBox,
    Unsupported,
}

#[derive(Debug, Clone)]
struct FormField {
    id: LoObjectId,
    name: String,
    kind: FieldKind,
    default_appearance: String,
    quadding: i64,
    flags: i64,
    widgets: Vec<LoObjectId>,
}

#[derive(Debug, Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    default_appearance: Option<String>,
    quadding: Option<i64>,
    flags: Option<i64>,
}

fn resolve<'a>(doc: &'a LoDocument, obj: &'a LoObject) -> &'a LoObject {
    match obj {
        LoObject::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn catalog_id(doc: &LoDocument) -> Result<LoObjectId, FundFormError> {
    doc.trailer
        .get(b"Root")
        .and_then(LoObject::as_reference)
        .map_err(lopdf_err)
}

fn acro_form(doc: &LoDocument) -> Option<&Dictionary> {
    let catalog = doc.get_object(catalog_id(doc).ok()?).ok()?.as_dict().ok()?;
    resolve(doc, catalog.get(b"AcroForm").ok()?).as_dict().ok()
}

fn collect_fields(doc: &LoDocument) -> Vec<FormField> {
    let Some(form) = acro_form(doc) else {
        return Vec::new();
    };
    let Some(roots) = form
        .get(b"Fields")
        .ok()
        .and_then(|fields| resolve(doc, fields).as_array().ok())
    else {
        return Vec::new();
    };
    let inherited = Inherited {
        default_appearance: form.get(b"DA").ok().and_then(decode_text),
        ..Inherited::default()
    };
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for root in roots {
        if let Ok(id) = root.as_reference() {
            walk_field(doc, id, "", &inherited, 0, &mut seen, &mut out);
        }
    }
    out
}

fn walk_field(
    doc: &LoDocument,
    id: LoObjectId,
    parent_name: &str,
    inherited: &Inherited,
    depth: usize,
    seen: &mut BTreeSet<LoObjectId>,
    out: &mut Vec<FormField>,
) {
    if depth > MAX_TREE_DEPTH || !seen.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_object(id).and_then(LoObject::as_dict) else {
        return;
    };
    let name = match dict.get(b"T").ok().and_then(decode_text) {
        Some(partial) if parent_name.is_empty() => partial,
        Some(partial) => format!("{parent_name}.{partial}"),
        None => parent_name.to_string(),
    };
    let inherited = Inherited {
        field_type: dict
            .get(b"FT")
            .and_then(LoObject::as_name)
            .ok()
            .map(<[u8]>::to_vec)
            .or_else(|| inherited.field_type.clone()),
        default_appearance: dict
            .get(b"DA")
            .ok()
            .and_then(decode_text)
            .or_else(|| inherited.default_appearance.clone()),
        quadding: dict.get(b"Q").and_then(LoObject::as_i64).ok().or(inherited.quadding),
        flags: dict.get(b"Ff").and_then(LoObject::as_i64).ok().or(inherited.flags),
    };

    let kids: Vec<LoObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|kids| resolve(doc, kids).as_array().ok())
        .map(|kids| kids.iter().filter_map(|kid| kid.as_reference().ok()).collect())
        .unwrap_or_default();
    let child_fields: Vec<LoObjectId> = kids
        .iter()
        .copied()
        .filter(|kid| {
            doc.get_object(*kid)
                .and_then(LoObject::as_dict)
                .map(|kid| kid.has(b"T"))
                .unwrap_or(false)
        })
        .collect();
    if !child_fields.is_empty() {
        for kid in child_fields {
            walk_field(doc, kid, &name, &inherited, depth + 1, seen, out);
        }
        return;
    }
    if name.is_empty() {
        return;
    }

    let flags = inherited.flags.unwrap_or(0);
    let kind = match inherited.field_type.as_deref() {
        Some(b"Tx") => FieldKind::Text,
        Some(b"Ch") => FieldKind::Choice,
        Some(b"Btn") if flags & (FIELD_FLAG_RADIO | FIELD_FLAG_PUSHBUTTON) == 0 => {
            FieldKind::CheckBox
        }
        _ => FieldKind::Unsupported,
    };
    out.push(FormField {
        id,
        name,
        kind,
        default_appearance: inherited.default_appearance.unwrap_or_default(),
        quadding: inherited.quadding.unwrap_or(0),
        flags,
        widgets: if kids.is_empty() { vec![id] } else { kids },
    });
}

// Full qualified name first, then the terminal partial name.
fn lookup_value<'a>(values: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    values
        .get(name)
        .or_else(|| name.rsplit('.').next().and_then(|tail| values.get(tail)))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn decode_text(obj: &LoObject) -> Option<String> {
    let LoObject::String(bytes, _) = obj else {
        return None;
    };
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    Some(bytes.iter().map(|b| *b as char).collect())
}

fn text_string(value: &str) -> LoObject {
    if value.is_ascii() {
        return LoObject::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    LoObject::String(bytes, StringFormat::Hexadecimal)
}

fn number(obj: &LoObject) -> Option<f32> {
    match obj {
        LoObject::Integer(value) => Some(*value as f32),
        LoObject::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn rect_of(doc: &LoDocument, obj: &LoObject) -> Option<[f32; 4]> {
    let values = resolve(doc, obj).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut nums = [0.0f32; 4];
    for (slot, value) in nums.iter_mut().zip(values) {
        *slot = number(resolve(doc, value))?;
    }
    Some([
        nums[0].min(nums[2]),
        nums[1].min(nums[3]),
        nums[0].max(nums[2]),
        nums[1].max(nums[3]),
    ])
}

fn widget_rect(doc: &LoDocument, widget: LoObjectId) -> Option<[f32; 4]> {
    let dict = doc.get_object(widget).and_then(LoObject::as_dict).ok()?;
    rect_of(doc, dict.get(b"Rect").ok()?)
}

fn set_entry(
    doc: &mut LoDocument,
    id: LoObjectId,
    key: &str,
    value: impl Into<LoObject>,
) -> Result<(), FundFormError> {
    doc.get_object_mut(id)
        .and_then(LoObject::as_dict_mut)
        .map_err(lopdf_err)?
        .set(key, value);
    Ok(())
}

// Size and colour operator pulled from a `/DA` string such as
// `/Helv 0 Tf 0 g`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DefaultAppearance {
    pub size: f32,
    pub color: String,
}

pub(crate) fn parse_default_appearance(da: &str) -> DefaultAppearance {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let numbers = |range: std::ops::Range<usize>| -> Option<Vec<String>> {
        tokens
            .get(range)?
            .iter()
            .map(|tok| tok.parse::<f32>().ok().map(fmt))
            .collect()
    };
    let mut parsed = DefaultAppearance {
        size: 0.0,
        color: "0 g".to_string(),
    };
    for (idx, token) in tokens.iter().enumerate() {
        let operands = match *token {
            "Tf" if idx >= 1 => {
                parsed.size = tokens[idx - 1].parse::<f32>().unwrap_or(0.0).max(0.0);
                continue;
            }
            "g" if idx >= 1 => numbers(idx - 1..idx),
            "rg" if idx >= 3 => numbers(idx - 3..idx),
            "k" if idx >= 4 => numbers(idx - 4..idx),
            _ => None,
        };
        if let Some(operands) = operands {
            parsed.color = format!("{} {}", operands.join(" "), token);
        }
    }
    parsed
}

fn auto_font_size(value: &str, inner_width: f32, height: f32, multiline: bool) -> f32 {
    let cap = ((height - 2.0 * APPEARANCE_PADDING) / LINE_SPACING).max(AUTO_FONT_MIN);
    if multiline {
        return MULTILINE_FONT.min(cap);
    }
    let mut size = AUTO_FONT_MAX.min(cap);
    let width = Pt::from_f32(inner_width);
    while size > AUTO_FONT_MIN
        && measure_text_width(StandardFont::Helvetica, Pt::from_f32(size), value) > width
    {
        size -= 0.5;
    }
    size.max(AUTO_FONT_MIN)
}

// Content of a text widget's normal appearance, in a `width` x `height`
// form space.
pub(crate) fn text_appearance(
    value: &str,
    width: f32,
    height: f32,
    da: &DefaultAppearance,
    quadding: i64,
    multiline: bool,
) -> Vec<u8> {
    let font = StandardFont::Helvetica;
    let inner_width = (width - 2.0 * APPEARANCE_PADDING).max(0.0);
    let size = if da.size > 0.0 {
        da.size
    } else {
        auto_font_size(value, inner_width, height, multiline)
    };
    let size_pt = Pt::from_f32(size);
    let lines = if multiline {
        wrap_text(font, size_pt, value, Pt::from_f32(inner_width))
    } else {
        vec![value.replace(['\r', '\n'], " ")]
    };
    let first_baseline = if multiline {
        height - APPEARANCE_PADDING - size
    } else {
        (height - size) / 2.0 + size * 0.22
    };

    let mut out = String::from("/Tx BMC\nq\n");
    out.push_str(&format!(
        "1 1 {} {} re W n\nBT\n/{} {} Tf\n{}\n",
        fmt(width - 2.0),
        fmt(height - 2.0),
        APPEARANCE_FONT,
        fmt(size),
        da.color
    ));
    for (idx, line) in lines.iter().enumerate() {
        let line_width = measure_text_width(font, size_pt, line).to_f32();
        let x = match quadding {
            1 => (width - line_width) / 2.0,
            2 => width - APPEARANCE_PADDING - line_width,
            _ => APPEARANCE_PADDING,
        };
        let y = first_baseline - size * LINE_SPACING * idx as f32;
        out.push_str(&format!(
            "1 0 0 1 {} {} Tm\n({}) Tj\n",
            fmt(x),
            fmt(y),
            encode_winansi_pdf_string(line)
        ));
    }
    out.push_str("ET\nQ\nEMC\n");
    out.into_bytes()
}

fn bbox(width: f32, height: f32) -> Vec<LoObject> {
    vec![0.into(), 0.into(), width.into(), height.into()]
}

fn write_text_field(
    doc: &mut LoDocument,
    field: &FormField,
    value: &str,
    font_id: LoObjectId,
) -> Result<(), FundFormError> {
    set_entry(doc, field.id, "V", text_string(value))?;
    let da = parse_default_appearance(&field.default_appearance);
    let multiline = field.kind == FieldKind::Text && field.flags & FIELD_FLAG_MULTILINE != 0;
    for widget in &field.widgets {
        let Some(rect) = widget_rect(doc, *widget) else {
            continue;
        };
        let (width, height) = (rect[2] - rect[0], rect[3] - rect[1]);
        let content = text_appearance(value, width, height, &da, field.quadding, multiline);
        let appearance = doc.add_object(LoStream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => bbox(width, height),
                "Resources" => dictionary! {
                    "Font" => dictionary! { APPEARANCE_FONT => font_id },
                },
            },
            content,
        ));
        set_entry(doc, *widget, "AP", dictionary! { "N" => appearance })?;
    }
    Ok(())
}

fn on_state_name(doc: &LoDocument, widget: LoObjectId) -> Option<Vec<u8>> {
    let dict = doc.get_object(widget).and_then(LoObject::as_dict).ok()?;
    let appearances = resolve(doc, dict.get(b"AP").ok()?).as_dict().ok()?;
    let normal = resolve(doc, appearances.get(b"N").ok()?).as_dict().ok()?;
    normal
        .iter()
        .map(|(name, _)| name)
        .find(|name| name.as_slice() != b"Off")
        .cloned()
}

fn check_box_appearance(width: f32, height: f32) -> Vec<u8> {
    let (x0, y0) = (APPEARANCE_PADDING, APPEARANCE_PADDING);
    let (x1, y1) = (width - APPEARANCE_PADDING, height - APPEARANCE_PADDING);
    format!(
        "q 0 G 1 w {} {} m {} {} l S {} {} m {} {} l S Q\n",
        fmt(x0),
        fmt(y0),
        fmt(x1),
        fmt(y1),
        fmt(x0),
        fmt(y1),
        fmt(x1),
        fmt(y0)
    )
    .into_bytes()
}

fn write_check_box(
    doc: &mut LoDocument,
    field: &FormField,
    value: &str,
) -> Result<bool, FundFormError> {
    let checked = match to_yes_no(value).as_str() {
        "YES" => true,
        "NO" => false,
        _ => return Ok(false),
    };
    let field_on = field
        .widgets
        .iter()
        .find_map(|widget| on_state_name(doc, *widget))
        .unwrap_or_else(|| b"Yes".to_vec());
    let state = |on: &[u8]| {
        if checked {
            LoObject::Name(on.to_vec())
        } else {
            LoObject::Name(b"Off".to_vec())
        }
    };
    set_entry(doc, field.id, "V", state(&field_on))?;

    for widget in &field.widgets {
        let on = match on_state_name(doc, *widget) {
            Some(on) => on,
            None => {
                let Some(rect) = widget_rect(doc, *widget) else {
                    continue;
                };
                let (width, height) = (rect[2] - rect[0], rect[3] - rect[1]);
                let form = || {
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => bbox(width, height),
                    }
                };
                let on_id = doc.add_object(LoStream::new(form(), check_box_appearance(width, height)));
                let off_id = doc.add_object(LoStream::new(form(), Vec::new()));
                let mut normal = Dictionary::new();
                normal.set(field_on.clone(), on_id);
                normal.set("Off", off_id);
                set_entry(doc, *widget, "AP", dictionary! { "N" => normal })?;
                field_on.clone()
            }
        };
        set_entry(doc, *widget, "AS", state(&on))?;
    }
    Ok(true)
}

fn register_form_font(doc: &mut LoDocument, font_id: LoObjectId) -> Result<(), FundFormError> {
    let Some(form) = acro_form(doc) else {
        return Ok(());
    };
    let mut resources = form
        .get(b"DR")
        .map(|dr| resolve(doc, dr))
        .and_then(LoObject::as_dict)
        .cloned()
        .unwrap_or_default();
    let mut fonts = resources
        .get(b"Font")
        .map(|fonts| resolve(doc, fonts))
        .and_then(LoObject::as_dict)
        .cloned()
        .unwrap_or_default();
    fonts.set(APPEARANCE_FONT, font_id);
    resources.set("Font", fonts);

    let catalog_id = catalog_id(doc)?;
    let form_ref = doc
        .get_object(catalog_id)
        .and_then(LoObject::as_dict)
        .and_then(|catalog| catalog.get(b"AcroForm"))
        .and_then(LoObject::as_reference)
        .ok();
    let form = match form_ref {
        Some(id) => doc.get_object_mut(id).and_then(LoObject::as_dict_mut),
        None => doc
            .get_object_mut(catalog_id)
            .and_then(LoObject::as_dict_mut)
            .and_then(|catalog| catalog.get_mut(b"AcroForm"))
            .and_then(LoObject::as_dict_mut),
    }
    .map_err(lopdf_err)?;
    form.set("DR", resources);
    form.set("NeedAppearances", false);
    Ok(())
}

fn inherited_resources(doc: &LoDocument, page: &Dictionary) -> Dictionary {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)
                .as_dict()
                .cloned()
                .unwrap_or_default();
        }
        match node
            .get(b"Parent")
            .and_then(LoObject::as_reference)
            .and_then(|id| doc.get_object(id))
            .and_then(LoObject::as_dict)
        {
            Ok(parent) => node = parent,
            Err(_) => break,
        }
    }
    Dictionary::new()
}

struct Placement {
    appearance: LoObjectId,
    matrix: [f32; 6],
}

fn widget_placement(doc: &LoDocument, widget: &Dictionary) -> Option<Placement> {
    let flags = widget.get(b"F").and_then(LoObject::as_i64).unwrap_or(0);
    if flags & (ANNOT_FLAG_HIDDEN | ANNOT_FLAG_NOVIEW) != 0 {
        return None;
    }
    let rect = rect_of(doc, widget.get(b"Rect").ok()?)?;
    let appearances = resolve(doc, widget.get(b"AP").ok()?).as_dict().ok()?;
    let normal = appearances.get(b"N").ok()?;
    let appearance = match normal {
        LoObject::Reference(id)
            if doc
                .get_object(*id)
                .map(|obj| obj.as_stream().is_ok())
                .unwrap_or(false) =>
        {
            *id
        }
        other => {
            let states = resolve(doc, other).as_dict().ok()?;
            let state = widget.get(b"AS").and_then(LoObject::as_name).ok()?;
            states.get(state).ok()?.as_reference().ok()?
        }
    };
    let stream = doc.get_object(appearance).and_then(LoObject::as_stream).ok()?;
    let (width, height) = (rect[2] - rect[0], rect[3] - rect[1]);
    let bounds = stream
        .dict
        .get(b"BBox")
        .ok()
        .and_then(|bbox| rect_of(doc, bbox))
        .unwrap_or([0.0, 0.0, width, height]);
    let (bw, bh) = (bounds[2] - bounds[0], bounds[3] - bounds[1]);
    if bw <= 0.0 || bh <= 0.0 {
        return None;
    }
    let (sx, sy) = (width / bw, height / bh);
    Some(Placement {
        appearance,
        matrix: [sx, 0.0, 0.0, sy, rect[0] - bounds[0] * sx, rect[1] - bounds[1] * sy],
    })
}

// Each stream of a /Contents array ends on its own line so operators never
// merge across stream boundaries.
fn page_content(doc: &LoDocument, page_id: LoObjectId) -> Vec<u8> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let Ok(stream) = doc.get_object(id).and_then(LoObject::as_stream) else {
            continue;
        };
        match stream.decompressed_content() {
            Ok(data) => content.extend(data),
            Err(_) => content.extend_from_slice(&stream.content),
        }
        content.push(b'\n');
    }
    content
}

fn is_widget(annot: &Dictionary) -> bool {
    annot
        .get(b"Subtype")
        .and_then(LoObject::as_name)
        .map(|subtype| subtype == b"Widget")
        .unwrap_or(false)
}

// Stamps every visible widget appearance into its page, drops widget
// annotations and removes the AcroForm. Returns the number of stamped
// widgets.
fn flatten_form(doc: &mut LoDocument) -> Result<usize, FundFormError> {
    let page_ids: Vec<LoObjectId> = doc.get_pages().values().copied().collect();
    let mut stamped = 0usize;
    for page_id in page_ids {
        let page = doc
            .get_object(page_id)
            .and_then(LoObject::as_dict)
            .map_err(lopdf_err)?
            .clone();
        let Ok(annots) = page.get(b"Annots") else {
            continue;
        };
        let annots = resolve(doc, annots).as_array().cloned().unwrap_or_default();

        let mut kept = Vec::new();
        let mut placements = Vec::new();
        for annot in annots {
            let widget = annot
                .as_reference()
                .and_then(|id| doc.get_object(id))
                .and_then(LoObject::as_dict)
                .ok()
                .filter(|dict| is_widget(dict));
            match widget {
                Some(widget) => placements.extend(widget_placement(doc, widget)),
                None => kept.push(annot),
            }
        }

        let mut resources = inherited_resources(doc, &page);
        let mut xobjects = resources
            .get(b"XObject")
            .map(|xobjects| resolve(doc, xobjects))
            .and_then(LoObject::as_dict)
            .cloned()
            .unwrap_or_default();
        let mut content = b"q\n".to_vec();
        content.extend(page_content(doc, page_id));
        content.extend_from_slice(b"Q\n");
        let mut counter = 0usize;
        for placement in &placements {
            let name = loop {
                counter += 1;
                let candidate = format!("FW{counter}");
                if !xobjects.has(candidate.as_bytes()) {
                    break candidate;
                }
            };
            xobjects.set(name.clone(), placement.appearance);
            let m = placement.matrix.map(fmt);
            content.extend(
                format!("q {} {} {} {} {} {} cm /{} Do Q\n", m[0], m[1], m[2], m[3], m[4], m[5], name)
                    .into_bytes(),
            );
        }
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));

        let page_mut = doc
            .get_object_mut(page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page_mut.set("Resources", resources);
        page_mut.set("Contents", content_id);
        if kept.is_empty() {
            page_mut.remove(b"Annots");
        } else {
            page_mut.set("Annots", kept);
        }
        stamped += placements.len();
    }

    let catalog_id = catalog_id(doc)?;
    doc.get_object_mut(catalog_id)
        .and_then(LoObject::as_dict_mut)
        .map_err(lopdf_err)?
        .remove(b"AcroForm");
    Ok(stamped)
}

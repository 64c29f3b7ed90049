use anyhow::{anyhow, Context, Result};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use owned_ttf_parser::{name_id, AsFaceRef, Face, GlyphId, OwnedFace};
use std::collections::BTreeMap;
use std::path::Path;

/// A TrueType font loaded from disk, ready to be embedded.
///
/// Text is drawn with the composite `Identity-H` encoding, where every character is
/// written as its two-byte glyph ID. That keeps the full glyph set of large CJK fonts
/// reachable without building a custom encoding, at the cost of having to record which
/// glyphs were used so their widths and Unicode mappings can be written at save time.
pub struct TrueTypeFont {
    /// Name the font is registered under in page resources
    pub name: String,
    face: OwnedFace,
    units_per_em: f32,
    /// Glyphs drawn so far, mapped back to the character they came from
    used: BTreeMap<u16, char>,
}

impl TrueTypeFont {
    pub fn load(name: &str, path: &Path) -> Result<TrueTypeFont> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        TrueTypeFont::from_data(name, data)
            .with_context(|| format!("Failed to parse font file: {}", path.display()))
    }

    pub fn from_data(name: &str, data: Vec<u8>) -> Result<TrueTypeFont> {
        let face = OwnedFace::from_vec(data, 0).map_err(|e| anyhow!("{e}"))?;
        let units_per_em = face.as_face_ref().units_per_em() as f32;
        Ok(TrueTypeFont {
            name: name.to_string(),
            face,
            units_per_em,
            used: BTreeMap::default(),
        })
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    /// Encode `text` as big-endian glyph IDs, recording each glyph as used.
    ///
    /// Characters the font has no glyph for are drawn as glyph 0 (`.notdef`).
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = self.face.as_face_ref().glyph_index(ch).map(|g| g.0).unwrap_or(0);
            if gid != 0 {
                self.used.entry(gid).or_insert(ch);
            }
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        bytes
    }

    pub fn used_glyph_count(&self) -> usize {
        self.used.len()
    }

    /// Scale font units to the 1000-unit text space PDF metrics use.
    fn scale(&self, units: f32) -> f32 {
        (units * 1000.0 / self.units_per_em).round()
    }

    fn postscript_name(&self) -> String {
        let face = self.face();
        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_else(|| self.name.clone());

        let sanitized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if sanitized.is_empty() {
            self.name.clone()
        } else {
            sanitized
        }
    }

    /// Write the font program and its dictionaries into `doc`, returning the ID of the
    /// Type0 font dictionary to reference from page resources.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let face = self.face();
        let base_font = self.postscript_name();

        let bbox = face.global_bounding_box();
        let ascent = self.scale(face.ascender() as f32);
        let descent = self.scale(face.descender() as f32);
        let cap_height = face
            .capital_height()
            .map(|h| self.scale(h as f32))
            .unwrap_or(ascent);

        let program = self.face.as_slice();
        let font_file_id = doc.add_object(Stream::new(
            dictionary! {
                "Length1" => program.len() as i64,
            },
            program.to_vec(),
        ));

        let font_bbox: Vec<Object> = vec![
            self.scale(bbox.x_min as f32).into(),
            self.scale(bbox.y_min as f32).into(),
            self.scale(bbox.x_max as f32).into(),
            self.scale(bbox.y_max as f32).into(),
        ];

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(base_font.clone().into_bytes()),
            // symbolic: glyphs are addressed by ID, not by a standard encoding
            "Flags" => 4,
            "FontBBox" => font_bbox,
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => descent,
            "CapHeight" => cap_height,
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let mut widths: Vec<Object> = Vec::with_capacity(self.used.len() * 2);
        for &gid in self.used.keys() {
            let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
            widths.push(Object::Integer(gid as i64));
            widths.push(Object::Array(vec![Object::from(self.scale(advance as f32))]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(base_font.clone().into_bytes()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            to_unicode_cmap(&self.used).into_bytes(),
        ));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(base_font.into_bytes()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        })
    }
}

/// Build a ToUnicode CMap so text copied out of the PDF maps back to the source.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    // a bfchar block holds at most 100 entries
    let entries: Vec<(&u16, &char)> = used.iter().collect();
    for block in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (gid, ch) in block {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end",
    );
    cmap
}

//! Read access to the journey planner's result page.
//!
//! The planner renders up to [`PANEL_COUNT`] itineraries as `div#fahrt-N`
//! blocks built from nested layout tables. Every region the scraper relies on
//! has a named accessor here, so a change of the remote markup shows up as a
//! [`LayoutError`] naming the region instead of a misread cell.
//!
//! Layout `vrsinfo-2013`, inside each panel:
//!
//! ```text
//! div#fahrt-N
//!   table > tr > td[2] > table > tr
//!     td[1] > div > table          stop table, one tr per stop
//!       tr > td[1] table tr[1] > td[2]   station name
//!       tr > td[2] table tr > td[2]      departure "HH:MM"
//!     td[2] b                       line label
//! ```

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};

use crate::time::parse_clock;

pub const LAYOUT_VERSION: &str = "vrsinfo-2013";
pub const PANEL_COUNT: usize = 5;

const PANEL_ID_PREFIX: &str = "fahrt-";

static PANEL_SELECTOR: OnceLock<Selector> = OnceLock::new();

fn panel_selector() -> &'static Selector {
    PANEL_SELECTOR.get_or_init(|| Selector::parse("div[id^='fahrt-']").expect("static selector"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "journey page layout {layout}: {region} in panel {panel}{}: {detail}",
    .row.map(|row| format!(" row {}", row)).unwrap_or_default()
)]
pub struct LayoutError {
    pub layout: &'static str,
    pub region: &'static str,
    pub panel: usize,
    pub row: Option<usize>,
    pub detail: String,
}

impl LayoutError {
    fn new(region: &'static str, panel: usize, row: Option<usize>, detail: impl Into<String>) -> Self {
        Self {
            layout: LAYOUT_VERSION,
            region,
            panel,
            row,
            detail: detail.into(),
        }
    }
}

#[derive(Debug)]
pub struct JourneyPage {
    document: Html,
}

impl JourneyPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Panel `number`, counted from 1 like the page's own ids.
    pub fn panel(&self, number: usize) -> Option<TripPanel<'_>> {
        let id = format!("{}{}", PANEL_ID_PREFIX, number);
        self.document
            .select(panel_selector())
            .find(|element| element.value().id() == Some(id.as_str()))
            .map(|element| TripPanel { number, element })
    }
}

#[derive(Debug)]
pub struct TripPanel<'a> {
    number: usize,
    element: ElementRef<'a>,
}

impl<'a> TripPanel<'a> {
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn line_label(&self) -> Option<String> {
        layout_rows(self.element)
            .filter_map(|row| child_elements(row, "td").nth(1))
            .flat_map(|cell| descendant_elements(cell, "b"))
            .next()
            .map(element_text)
    }

    pub fn stop_rows(&self) -> Result<Vec<StopRow<'a>>, LayoutError> {
        let table = layout_rows(self.element)
            .find_map(stop_table_in)
            .ok_or_else(|| LayoutError::new("stop table", self.number, None, "not found"))?;

        Ok(table_rows(table)
            .into_iter()
            .enumerate()
            .map(|(index, element)| StopRow {
                panel: self.number,
                index,
                element,
            })
            .collect())
    }
}

#[derive(Debug)]
pub struct StopRow<'a> {
    panel: usize,
    index: usize,
    element: ElementRef<'a>,
}

impl<'a> StopRow<'a> {
    pub fn station_name(&self) -> Result<String, LayoutError> {
        let cell = self.cell(0, "station cell")?;
        let name = descendant_elements(cell, "table")
            .filter_map(|table| table_rows(table).into_iter().next())
            .find_map(|row| child_elements(row, "td").nth(1))
            .map(element_text)
            .ok_or_else(|| self.error("station name", "not found"))?;
        if name.is_empty() {
            return Err(self.error("station name", "empty"));
        }
        Ok(name)
    }

    /// Departure as shown on the page, `(hours, minutes)`.
    pub fn departure_clock(&self) -> Result<(u32, u32), LayoutError> {
        let cell = self.cell(1, "time cell")?;
        let text = descendant_elements(cell, "table")
            .flat_map(table_rows)
            .find_map(|row| child_elements(row, "td").nth(1))
            .map(element_text)
            .ok_or_else(|| self.error("departure time", "not found"))?;
        parse_clock(&text).map_err(|err| self.error("departure time", err.to_string()))
    }

    fn cell(&self, position: usize, region: &'static str) -> Result<ElementRef<'a>, LayoutError> {
        child_elements(self.element, "td")
            .nth(position)
            .ok_or_else(|| self.error(region, "not found"))
    }

    fn error(&self, region: &'static str, detail: impl Into<String>) -> LayoutError {
        LayoutError::new(region, self.panel, Some(self.index), detail)
    }
}

/// Rows of the itinerary tables: any `table tr > td[2] > table tr` inside
/// the panel. Tables enclosing the panel never take part.
fn layout_rows<'a>(panel: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    descendant_elements(panel, "table")
        .flat_map(|table| descendant_elements(table, "tr"))
        .filter_map(|row| child_elements(row, "td").nth(1))
        .flat_map(|cell| child_elements(cell, "table"))
        .flat_map(|table| descendant_elements(table, "tr"))
}

/// `td[1] > div > table` of a layout row.
fn stop_table_in(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    child_elements(row, "td")
        .next()
        .into_iter()
        .flat_map(|cell| child_elements(cell, "div"))
        .flat_map(|div| child_elements(div, "table"))
        .next()
}

fn child_elements<'a>(
    element: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

fn descendant_elements<'a>(
    element: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

/// Rows owned by `table` itself, not those of nested tables. The parser
/// wraps rows in an implicit `tbody`.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(child_elements(child, "tr")),
            _ => {}
        }
    }
    rows
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// One itinerary panel in the planner's markup.
    pub fn panel(number: usize, line: &str, stops: &[(&str, &str)]) -> String {
        let rows: String = stops
            .iter()
            .map(|(station, time)| {
                format!(
                    "<tr>\
                       <td><table><tr><td><img src=\"h.gif\"></td><td>{}</td></tr>\
                              <tr><td></td><td>Gleis 1</td></tr></table></td>\
                       <td><table><tr><td>ab</td><td>{}</td></tr></table></td>\
                     </tr>",
                    station, time
                )
            })
            .collect();
        format!(
            "<div id=\"fahrt-{}\"><table><tr>\
               <td>Fahrt {}</td>\
               <td><table><tr>\
                 <td><div><table>{}</table></div></td>\
                 <td><img src=\"bus.gif\"> <b>{}</b></td>\
               </tr></table></td>\
             </tr></table></div>",
            number, number, rows, line
        )
    }

    /// Puts the panels inside the site's navigation table.
    pub fn framed_page(panels: &[String]) -> String {
        page(&[format!(
            "<table><tr><td>Navigation</td><td><table><tr><td>{}</td></tr></table></td></tr></table>",
            panels.concat()
        )])
    }

    pub fn page(panels: &[String]) -> String {
        format!(
            "<html><head><title>Fahrplanauskunft</title></head><body>{}</body></html>",
            panels.concat()
        )
    }
}

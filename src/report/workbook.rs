use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLine, ChartMarker, ChartMarkerType, ChartType, Color, Format,
    Formula, Workbook, Worksheet, XlsxError,
};

use crate::calibration::fit::Calibration;

pub const CALIBRATION_SHEET: &str = "Calibration";
pub const SAMPLES_SHEET: &str = "Samples";

const CALIBRATION_HEADERS: [&str; 4] = ["Concentration", "MeanAbs", "MeanAbs_blank_sub", "Fitted"];
const SAMPLES_HEADERS: [&str; 4] = ["Well", "Absorbance", "Abs_blank_sub", "Estimated_Conc"];

/// Columns in the Calibration sheet.
const COL_CONC: u16 = 0;
const COL_BLANK_SUB: u16 = 2;
const COL_FITTED: u16 = 3;

/// Write the Calibration and Samples sheets, with a scatter chart of the
/// standards and fitted line, to an `.xlsx` file.
pub fn write_workbook(path: &Path, cal: &Calibration) -> Result<()> {
    let mut workbook = Workbook::new();
    workbook.push_worksheet(calibration_sheet(cal).context("building Calibration sheet")?);
    workbook.push_worksheet(samples_sheet(cal).context("building Samples sheet")?);
    workbook
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    Ok(())
}

fn calibration_sheet(cal: &Calibration) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(CALIBRATION_SHEET)?;
    sheet.set_column_width(0, 16)?;
    sheet.set_column_width(2, 18)?;
    write_headers(&mut sheet, &CALIBRATION_HEADERS)?;

    for (i, point) in cal.standards.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, COL_CONC, point.concentration)?;
        sheet.write_number(row, 1, point.mean_absorbance)?;
        sheet.write_number(row, COL_BLANK_SUB, point.blank_subtracted)?;
        sheet.write_number(row, COL_FITTED, cal.fit.predict(point.concentration))?;
    }

    let last = cal.standards.len() as u32;
    if last > 0 {
        let chart = calibration_chart(cal, last);
        sheet.insert_chart(1, 5, &chart)?;
    }

    let meta = last + 3;
    let summary: [(&str, f64); 4] = [
        ("Slope (m)", cal.fit.slope),
        ("Intercept (b)", cal.fit.intercept),
        ("R^2", cal.fit.r_squared),
        ("Blank mean", cal.blank_mean),
    ];
    for (i, (label, value)) in summary.iter().enumerate() {
        sheet.write_string(meta + i as u32, 0, *label)?;
        sheet.write_number(meta + i as u32, 1, *value)?;
    }
    sheet.write_string(meta + 4, 0, "Fitted function")?;
    sheet.write_string(meta + 4, 1, cal.fit.equation())?;

    Ok(sheet)
}

fn calibration_chart(cal: &Calibration, last: u32) -> Chart {
    let mut chart = Chart::new(ChartType::ScatterStraightWithMarkers);

    chart
        .add_series()
        .set_name("Standards")
        .set_categories((CALIBRATION_SHEET, 1, COL_CONC, last, COL_CONC))
        .set_values((CALIBRATION_SHEET, 1, COL_BLANK_SUB, last, COL_BLANK_SUB))
        .set_marker(ChartMarker::new().set_type(ChartMarkerType::Circle).set_size(6));

    chart
        .add_series()
        .set_name("Fit")
        .set_categories((CALIBRATION_SHEET, 1, COL_CONC, last, COL_CONC))
        .set_values((CALIBRATION_SHEET, 1, COL_FITTED, last, COL_FITTED))
        .set_format(ChartFormat::new().set_line(ChartLine::new().set_color(Color::Red)));

    let title = format!("Calibration (R^2={:.3})", cal.fit.r_squared);
    chart.title().set_name(title.as_str());
    chart.x_axis().set_name("Concentration");
    chart.y_axis().set_name("Absorbance (blank-subtracted)");
    // 1.5x the default 480x288.
    chart.set_width(720).set_height(432);
    chart
}

/// Estimated concentrations are written as formulas over the blank-subtracted
/// column so the sheet stays live if a reading is edited.
fn samples_sheet(cal: &Calibration) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(SAMPLES_SHEET)?;
    sheet.set_column_width(2, 14)?;
    sheet.set_column_width(3, 16)?;
    write_headers(&mut sheet, &SAMPLES_HEADERS)?;

    let (m, b) = (cal.fit.slope, cal.fit.intercept);
    for (i, sample) in cal.samples.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, sample.well.to_string())?;
        if let Some(raw) = sample.raw {
            sheet.write_number(row, 1, raw)?;
        }
        if let Some(adj) = sample.blank_subtracted {
            sheet.write_number(row, 2, adj)?;
        }

        let formula = match (sample.blank_subtracted, sample.concentration) {
            (Some(_), Some(est)) => {
                Formula::new(format!("=(C{} - {b}) / {m}", row + 1)).set_result(est.to_string())
            }
            _ => Formula::new("=NA()").set_result("#N/A"),
        };
        sheet.write_formula(row, 3, formula)?;
    }
    Ok(sheet)
}

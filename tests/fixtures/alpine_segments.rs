//! Well-known climbs around Bourg-d'Oisans and the Maurienne.
//!
//! Entry/exit points are the bottom and top of each climb, taken from
//! OpenStreetMap. Lengths and gains are the commonly quoted figures.

use trip_planner::model::{Coordinate, SegmentMeta};

fn climb(
    id: &str,
    name: &str,
    bottom: (f64, f64),
    top: (f64, f64),
    length_km: f64,
    gain_m: f64,
) -> SegmentMeta {
    SegmentMeta {
        id: id.to_string(),
        name: name.to_string(),
        length_meters: length_km * 1000.0,
        elevation_gain_meters: gain_m,
        entry_coordinate: Coordinate::new(bottom.0, bottom.1),
        exit_coordinate: Coordinate::new(top.0, top.1),
    }
}

pub fn alpe_d_huez() -> SegmentMeta {
    climb("629046", "Alpe d'Huez", (6.0336, 45.0542), (6.0706, 45.0916), 13.8, 1071.0)
}

pub fn col_du_galibier() -> SegmentMeta {
    climb("612315", "Col du Galibier (Valloire)", (6.4290, 45.1650), (6.4078, 45.0642), 18.1, 1245.0)
}

pub fn col_du_telegraphe() -> SegmentMeta {
    climb("660734", "Col du Télégraphe", (6.4434, 45.2383), (6.4439, 45.2030), 11.9, 856.0)
}

pub fn col_de_la_croix_de_fer() -> SegmentMeta {
    climb("616450", "Col de la Croix de Fer", (6.0553, 45.1005), (6.2018, 45.2262), 29.0, 1520.0)
}

pub fn col_de_sarenne() -> SegmentMeta {
    climb("1076298", "Col de Sarenne", (6.1340, 45.0426), (6.1463, 45.0787), 12.8, 950.0)
}

pub fn les_deux_alpes() -> SegmentMeta {
    climb("656102", "Les Deux Alpes", (6.0612, 45.0216), (6.1215, 45.0111), 9.8, 650.0)
}

pub fn all_climbs() -> Vec<SegmentMeta> {
    vec![
        alpe_d_huez(),
        col_du_galibier(),
        col_du_telegraphe(),
        col_de_la_croix_de_fer(),
        col_de_sarenne(),
        les_deux_alpes(),
    ]
}

/// Bourg-d'Oisans town centre, `[lon, lat]`.
pub const BOURG_D_OISANS: [f64; 2] = [6.0306, 45.0553];

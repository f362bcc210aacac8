//! Spatial reference handling and point reprojection.

use log::debug;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::{LcpError, LcpErrorCode, Result};

/// EPSG code of the geographic system the header latitude is expressed in.
pub const NAD83_EPSG: u16 = 4269;

const DEGREE_IN_RADIANS: f64 = 0.017_453_292_519_943_295;

/// A coordinate reference system known by EPSG code, PROJ string, WKT, or
/// any combination of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpatialRef {
    epsg: Option<u16>,
    proj4: Option<String>,
    wkt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearUnitDef {
    pub name: String,
    pub scale: f64,
}

impl SpatialRef {
    pub fn from_epsg(code: u16) -> Result<Self> {
        let def = crs_definitions::from_code(code).ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::GeoReference,
                format!("EPSG:{code} is not in the crs-definitions database."),
            )
        })?;
        Ok(Self {
            epsg: Some(code),
            proj4: Some(def.proj4.to_string()),
            wkt: Some(def.wkt.to_string()),
        })
    }

    pub fn from_proj4(proj4: impl Into<String>) -> Self {
        Self {
            proj4: Some(proj4.into()),
            ..Self::default()
        }
    }

    /// Builds from WKT text. A root level EPSG authority is used to look up
    /// the PROJ definition. Without one (ESRI `.prj` files) the definition is
    /// assembled from the projection, parameter and spheroid nodes.
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into();
        let epsg = root_epsg(&wkt);
        let proj4 = epsg
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4.to_string())
            .or_else(|| wkt_to_proj4(&wkt));
        Self {
            epsg,
            proj4,
            wkt: Some(wkt),
        }
    }

    pub fn nad83() -> Result<Self> {
        Self::from_epsg(NAD83_EPSG)
    }

    pub fn epsg(&self) -> Option<u16> {
        self.epsg
    }

    pub fn proj4(&self) -> Option<&str> {
        self.proj4.as_deref()
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    pub fn is_geographic(&self) -> bool {
        if let Some(proj4) = &self.proj4 {
            return proj4.contains("+proj=longlat") || proj4.contains("+proj=latlong");
        }
        self.wkt.as_deref().and_then(root_keyword).is_some_and(|keyword| {
            ["GEOGCS", "GEOGCRS", "GEODCRS", "GEOGRAPHICCRS"]
                .iter()
                .any(|name| keyword.eq_ignore_ascii_case(name))
        })
    }

    /// The unit of the root `UNIT` node of the WKT, falling back to the PROJ
    /// `+units=` and `+to_meter=` parameters.
    pub fn linear_unit(&self) -> Option<LinearUnitDef> {
        if let Some(unit) = self.wkt.as_deref().and_then(wkt_root_unit) {
            return Some(unit);
        }
        let proj4 = self.proj4.as_deref()?;
        if self.is_geographic() {
            return Some(LinearUnitDef {
                name: "degree".to_string(),
                scale: DEGREE_IN_RADIANS,
            });
        }
        if let Some(units) = proj4_param(proj4, "units") {
            let (name, scale) = match units {
                "m" => ("metre", 1.0),
                "km" => ("kilometre", 1000.0),
                "ft" => ("foot", 0.3048),
                "us-ft" => ("US survey foot", 0.304_800_609_601_219_2),
                other => (other, f64::NAN),
            };
            return Some(LinearUnitDef {
                name: name.to_string(),
                scale,
            });
        }
        if let Some(to_meter) = proj4_param(proj4, "to_meter") {
            return to_meter.parse().ok().map(|scale| LinearUnitDef {
                name: "unknown".to_string(),
                scale,
            });
        }
        Some(LinearUnitDef {
            name: "metre".to_string(),
            scale: 1.0,
        })
    }
}

pub trait CoordinateTransform {
    fn transform(
        &self,
        source: &SpatialRef,
        target: &SpatialRef,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64)>;
}

/// [`CoordinateTransform`] backed by proj4rs. Geographic coordinates are
/// taken and returned in degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Proj4Transform;

impl Proj4Transform {
    fn projection(srs: &SpatialRef) -> Result<Proj> {
        let proj4 = srs.proj4().ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::GeoReference,
                "Spatial reference has no PROJ definition to transform with.",
            )
        })?;
        Proj::from_proj_string(proj4).map_err(|e| {
            LcpError::new(
                LcpErrorCode::GeoReference,
                format!("Invalid projection '{proj4}': {e:?}"),
            )
        })
    }
}

impl CoordinateTransform for Proj4Transform {
    fn transform(
        &self,
        source: &SpatialRef,
        target: &SpatialRef,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64)> {
        let source_proj = Self::projection(source)?;
        let target_proj = Self::projection(target)?;

        let mut point = if source.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&source_proj, &target_proj, &mut point).map_err(|e| {
            LcpError::new(
                LcpErrorCode::GeoReference,
                format!("Transform of ({x}, {y}) failed: {e:?}"),
            )
        })?;

        if target.is_geographic() {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

fn proj4_param<'a>(proj4: &'a str, name: &str) -> Option<&'a str> {
    proj4.split_whitespace().find_map(|token| {
        let (key, value) = token.trim_start_matches('+').split_once('=')?;
        (key == name).then_some(value)
    })
}

#[derive(Debug, Clone, Copy)]
struct WktNode<'a> {
    keyword: &'a str,
    body: &'a str,
}

impl WktNode<'_> {
    fn is(&self, keywords: &[&str]) -> bool {
        keywords
            .iter()
            .any(|keyword| self.keyword.eq_ignore_ascii_case(keyword))
    }
}

fn root_keyword(wkt: &str) -> Option<&str> {
    let open = wkt.find(['[', '('])?;
    Some(wkt[..open].trim())
}

fn root_children(wkt: &str) -> Vec<WktNode<'_>> {
    match wkt.find(['[', '(']) {
        Some(open) => children(&wkt[open + 1..]),
        None => Vec::new(),
    }
}

/// Child nodes of a node body. Stops at the bracket closing the body.
fn children(body: &str) -> Vec<WktNode<'_>> {
    let mut nodes = Vec::new();
    let mut depth = 0_usize;
    let mut in_quote = false;
    let mut token_start = 0;
    let mut body_start = 0;
    let mut keyword = "";

    for (index, byte) in body.bytes().enumerate() {
        match byte {
            b'"' => in_quote = !in_quote,
            _ if in_quote => {}
            b'[' | b'(' => {
                depth += 1;
                if depth == 1 {
                    keyword = body[token_start..index].trim();
                    body_start = index + 1;
                }
            }
            b']' | b')' => {
                if depth == 0 {
                    break;
                }
                if depth == 1 {
                    nodes.push(WktNode {
                        keyword,
                        body: &body[body_start..index],
                    });
                }
                depth -= 1;
            }
            b',' if depth == 0 => token_start = index + 1,
            _ => {}
        }
    }
    nodes
}

fn find_node<'a>(nodes: &[WktNode<'a>], keywords: &[&str]) -> Option<WktNode<'a>> {
    nodes.iter().copied().find(|node| node.is(keywords))
}

const WKT_PROJECTIONS: [(&[&str], &str); 4] = [
    (&["Transverse_Mercator", "Gauss_Kruger"], "tmerc"),
    (
        &[
            "Lambert_Conformal_Conic",
            "Lambert_Conformal_Conic_1SP",
            "Lambert_Conformal_Conic_2SP",
        ],
        "lcc",
    ),
    (&["Albers", "Albers_Conic_Equal_Area"], "aea"),
    (&["Mercator", "Mercator_1SP", "Mercator_2SP"], "merc"),
];

const WKT_PARAMETERS: [(&[&str], &str); 7] = [
    (&["central_meridian", "longitude_of_center", "longitude_of_origin"], "lon_0"),
    (&["latitude_of_origin", "latitude_of_center"], "lat_0"),
    (&["standard_parallel_1"], "lat_1"),
    (&["standard_parallel_2"], "lat_2"),
    (&["scale_factor"], "k"),
    (&["false_easting"], "x_0"),
    (&["false_northing"], "y_0"),
];

/// PROJ definition for a `GEOGCS` or `PROJCS` WKT1 definition without an
/// EPSG authority.
fn wkt_to_proj4(wkt: &str) -> Option<String> {
    let keyword = root_keyword(wkt)?;
    let nodes = root_children(wkt);

    if keyword.eq_ignore_ascii_case("GEOGCS") {
        let ellipsoid = wkt_ellipsoid(&nodes)?;
        return Some(format!("+proj=longlat {ellipsoid} +no_defs"));
    }
    if !keyword.eq_ignore_ascii_case("PROJCS") {
        return None;
    }

    let projection = find_node(&nodes, &["PROJECTION"])?;
    let projection_name = unquote(split_args(projection.body).first()?);
    let proj = WKT_PROJECTIONS
        .iter()
        .find(|(names, _)| names.iter().any(|name| name.eq_ignore_ascii_case(projection_name)))
        .map(|(_, proj)| *proj)?;
    let geogcs = find_node(&nodes, &["GEOGCS"])?;
    let ellipsoid = wkt_ellipsoid(&children(geogcs.body))?;
    let to_meter = wkt_root_unit(wkt).map_or(1.0, |unit| unit.scale);

    let mut parts = vec![format!("+proj={proj}")];
    for node in nodes.iter().filter(|node| node.is(&["PARAMETER"])) {
        let args = split_args(node.body);
        let (Some(name), Some(value)) = (
            args.first().copied().map(unquote),
            args.get(1).and_then(|value| value.parse::<f64>().ok()),
        ) else {
            continue;
        };
        let Some(key) = WKT_PARAMETERS
            .iter()
            .find(|(names, _)| names.iter().any(|known| known.eq_ignore_ascii_case(name)))
            .map(|(_, key)| *key)
        else {
            debug!("Ignoring WKT parameter {name}.");
            continue;
        };
        // False origins are in projected units, PROJ wants meters.
        let value = if key == "x_0" || key == "y_0" {
            value * to_meter
        } else {
            value
        };
        parts.push(format!("+{key}={value}"));
    }
    parts.push(ellipsoid);
    if to_meter != 1.0 {
        parts.push(format!("+to_meter={to_meter}"));
    }
    parts.push("+no_defs".to_string());
    Some(parts.join(" "))
}

/// `+a= +rf=` from `DATUM[...,SPHEROID[name,a,rf]]` among `geogcs` nodes.
fn wkt_ellipsoid(geogcs: &[WktNode<'_>]) -> Option<String> {
    let datum = find_node(geogcs, &["DATUM"])?;
    let spheroid = find_node(&children(datum.body), &["SPHEROID", "ELLIPSOID"])?;
    let args = split_args(spheroid.body);
    let a: f64 = args.get(1)?.parse().ok()?;
    let rf: f64 = args.get(2)?.parse().ok()?;
    if rf == 0.0 {
        Some(format!("+a={a} +b={a}"))
    } else {
        Some(format!("+a={a} +rf={rf}"))
    }
}

fn split_args(body: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0_usize;
    let mut in_quote = false;
    let mut start = 0;
    for (index, byte) in body.bytes().enumerate() {
        match byte {
            b'"' => in_quote = !in_quote,
            _ if in_quote => {}
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                args.push(body[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    args.push(body[start..].trim());
    args
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

fn wkt_root_unit(wkt: &str) -> Option<LinearUnitDef> {
    root_children(wkt)
        .into_iter()
        .find(|node| node.is(&["UNIT", "LENGTHUNIT"]))
        .and_then(|node| {
            let args = split_args(node.body);
            let name = unquote(args.first()?);
            let scale = args.get(1).and_then(|scale| scale.trim().parse().ok())?;
            Some(LinearUnitDef {
                name: name.to_string(),
                scale,
            })
        })
}

fn root_epsg(wkt: &str) -> Option<u16> {
    root_children(wkt)
        .into_iter()
        .filter(|node| node.is(&["AUTHORITY", "ID"]))
        .find_map(|node| {
            let args = split_args(node.body);
            let authority = unquote(args.first()?);
            if !authority.eq_ignore_ascii_case("EPSG") {
                return None;
            }
            unquote(args.get(1)?).parse().ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM_11N_WKT: &str = r#"PROJCS["NAD83 / UTM zone 11N",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["central_meridian",-117],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","26911"]]"#;

    const ESRI_UTM_11N_WKT: &str = r#"PROJCS["NAD_1983_UTM_Zone_11N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-117.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn root_unit_skips_nested_geographic_unit() {
        let unit = wkt_root_unit(UTM_11N_WKT).expect("root unit");
        assert_eq!(unit.name, "metre");
        assert_eq!(unit.scale, 1.0);
    }

    #[test]
    fn root_authority_is_found() {
        assert_eq!(root_epsg(UTM_11N_WKT), Some(26911));
        assert_eq!(root_epsg(r#"LOCAL_CS["x",UNIT["m",1]]"#), None);
    }

    #[test]
    fn wkt_without_root_unit_has_no_wkt_unit() {
        assert!(wkt_root_unit(r#"PROJCS["x",GEOGCS["y",UNIT["degree",0.01745]]]"#).is_none());
    }

    #[test]
    fn feet_unit_from_wkt() {
        let srs = SpatialRef::from_wkt(r#"PROJCS["x",UNIT["Foot_US",0.3048006096012192]]"#);
        let unit = srs.linear_unit().expect("unit");
        assert_eq!(unit.name, "Foot_US");
        assert!((unit.scale - 0.3048006096012192).abs() < 1e-12);
        assert!(!srs.is_geographic());
    }

    #[test]
    fn proj4_units_fallback() {
        let srs = SpatialRef::from_proj4("+proj=utm +zone=11 +ellps=GRS80 +units=ft +no_defs");
        let unit = srs.linear_unit().expect("unit");
        assert_eq!((unit.name.as_str(), unit.scale), ("foot", 0.3048));

        let srs = SpatialRef::from_proj4("+proj=longlat +datum=WGS84 +no_defs");
        assert!(srs.is_geographic());
        assert_eq!(srs.linear_unit().expect("unit").name, "degree");
    }

    #[test]
    fn epsg_lookup() {
        let srs = SpatialRef::from_epsg(32611).expect("known code");
        assert_eq!(srs.epsg(), Some(32611));
        assert!(srs.proj4().is_some_and(|proj4| proj4.contains("+proj=utm")));
        assert!(!srs.is_geographic());
        assert!(SpatialRef::nad83().expect("nad83").is_geographic());

        let error = SpatialRef::from_epsg(1).expect_err("unknown code");
        assert_eq!(error.code, LcpErrorCode::GeoReference);
    }

    #[test]
    fn utm_centre_reprojects_to_expected_latitude() {
        let source = SpatialRef::from_epsg(32611).expect("utm 11n");
        let target = SpatialRef::nad83().expect("nad83");
        let (lon, lat) = Proj4Transform
            .transform(&source, &target, 500_000.0, 5_000_000.0)
            .expect("transform");
        assert!((lon + 117.0).abs() < 0.01, "lon {lon}");
        assert!((lat - 45.15).abs() < 0.05, "lat {lat}");
    }

    #[test]
    fn esri_wkt_without_authority_is_reprojected() {
        let srs = SpatialRef::from_wkt(ESRI_UTM_11N_WKT);
        assert_eq!(srs.epsg(), None);
        let proj4 = srs.proj4().expect("assembled definition");
        assert!(proj4.starts_with("+proj=tmerc"), "{proj4}");
        assert!(proj4.contains("+lon_0=-117"), "{proj4}");
        assert!(proj4.contains("+k=0.9996"), "{proj4}");
        assert!(proj4.contains("+a=6378137 +rf=298.257222101"), "{proj4}");
        assert!(!srs.is_geographic());

        let target = SpatialRef::nad83().expect("nad83");
        let (lon, lat) = Proj4Transform
            .transform(&srs, &target, 500_000.0, 5_000_000.0)
            .expect("transform");
        assert!((lon + 117.0).abs() < 0.01, "lon {lon}");
        assert!((lat - 45.15).abs() < 0.05, "lat {lat}");
    }

    #[test]
    fn assembled_definition_keeps_units_in_meters() {
        let wkt = r#"PROJCS["NAD_1983_StatePlane_Oregon_North_FIPS_3601_Feet",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",8202099.737532808],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-120.5],PARAMETER["Standard_Parallel_1",44.33333333333334],PARAMETER["Standard_Parallel_2",46.0],PARAMETER["Latitude_Of_Origin",43.66666666666666],UNIT["Foot",0.3048]]"#;
        let proj4 = SpatialRef::from_wkt(wkt).proj4().expect("definition").to_string();
        assert!(proj4.starts_with("+proj=lcc"), "{proj4}");
        let x_0: f64 = proj4_param(&proj4, "x_0").and_then(|v| v.parse().ok()).expect("x_0");
        assert!((x_0 - 2_500_000.0).abs() < 1e-3, "{proj4}");
        assert_eq!(proj4_param(&proj4, "to_meter"), Some("0.3048"));
    }

    #[test]
    fn geographic_wkt_without_authority() {
        let wkt = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        let srs = SpatialRef::from_wkt(wkt);
        assert_eq!(
            srs.proj4(),
            Some("+proj=longlat +a=6378137 +rf=298.257222101 +no_defs")
        );
        assert!(srs.is_geographic());
    }

    #[test]
    fn unknown_projection_has_no_definition() {
        let wkt = r#"PROJCS["x",GEOGCS["y",DATUM["d",SPHEROID["s",6378137,298.257223563]]],PROJECTION["Some_Exotic_Projection"],UNIT["Meter",1]]"#;
        assert!(SpatialRef::from_wkt(wkt).proj4().is_none());
    }

    #[test]
    fn missing_proj_definition_is_georeference_error() {
        let source = SpatialRef::from_wkt(r#"LOCAL_CS["x",UNIT["m",1]]"#);
        let target = SpatialRef::nad83().expect("nad83");
        let error = Proj4Transform
            .transform(&source, &target, 0.0, 0.0)
            .expect_err("should fail");
        assert_eq!(error.code, LcpErrorCode::GeoReference);
    }
}

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nalgebra::Vector3;
use ndarray::Array1;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use ply_rs::{parser, ply};

use super::Geometry;
use crate::error::{Error, Result};

/// We know what data we want to read, hence we load it directly into this struct.
#[derive(Debug)]
struct Vertex {
    point: [f32; 3],
    normal: [f32; 3],
    color: [u8; 3],
}

impl ply::PropertyAccess for Vertex {
    fn new() -> Self {
        Vertex {
            point: [0f32; 3],
            normal: [0f32; 3],
            color: [0u8; 3],
        }
    }
    fn set_property(&mut self, key: String, property: ply::Property) {
        match (key.as_ref(), property) {
            ("x", ply::Property::Float(v)) => self.point[0] = v,
            ("y", ply::Property::Float(v)) => self.point[1] = v,
            ("z", ply::Property::Float(v)) => self.point[2] = v,
            ("nx", ply::Property::Float(v)) => self.normal[0] = v,
            ("ny", ply::Property::Float(v)) => self.normal[1] = v,
            ("nz", ply::Property::Float(v)) => self.normal[2] = v,
            ("red", ply::Property::UChar(v)) => self.color[0] = v,
            ("green", ply::Property::UChar(v)) => self.color[1] = v,
            ("blue", ply::Property::UChar(v)) => self.color[2] = v,
            (_, _) => (),
        }
    }
}

/// Reads the vertices of a PLY file.
pub fn read_ply<P>(filepath: P) -> Result<Geometry>
where
    P: AsRef<Path>,
{
    let fptr = std::fs::File::open(filepath)?;
    let mut f = std::io::BufReader::new(fptr);

    let vertex_parser = parser::Parser::<Vertex>::new();
    let header = vertex_parser.read_header(&mut f)?;

    let element = header
        .elements
        .get("vertex")
        .ok_or_else(|| Error::parser("PLY file without vertex element"))?;
    let vertex_vec = vertex_parser.read_payload_for_element(&mut f, element, &header)?;

    let has_keys = |keys: [&str; 3]| keys.iter().all(|k| element.properties.contains_key(*k));
    let normals = has_keys(["nx", "ny", "nz"]).then(|| {
        vertex_vec
            .iter()
            .map(|v| Vector3::new(v.normal[0], v.normal[1], v.normal[2]))
            .collect::<Array1<_>>()
    });
    let colors = has_keys(["red", "green", "blue"]).then(|| {
        vertex_vec
            .iter()
            .map(|v| Vector3::new(v.color[0], v.color[1], v.color[2]))
            .collect::<Array1<_>>()
    });

    Ok(Geometry {
        points: vertex_vec
            .iter()
            .map(|v| Vector3::new(v.point[0], v.point[1], v.point[2]))
            .collect(),
        colors,
        normals,
    })
}

/// Writes points, and colors and normals if present, into a PLY file.
pub fn write_ply<P>(filepath: P, geom: &Geometry) -> Result<()>
where
    P: AsRef<Path>,
{
    let mut ply = {
        let mut ply = Ply::<DefaultElement>::new();
        let mut vertex_element = ElementDef::new("vertex".to_string());
        ["x", "y", "z"].iter().for_each(|key| {
            vertex_element.properties.add(PropertyDef::new(
                key.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        });

        let mut vertex_array: Vec<DefaultElement> = geom
            .points
            .iter()
            .map(|point| {
                let mut elem = DefaultElement::new();
                elem.insert("x".to_string(), Property::Float(point[0]));
                elem.insert("y".to_string(), Property::Float(point[1]));
                elem.insert("z".to_string(), Property::Float(point[2]));
                elem
            })
            .collect();

        if let Some(normals) = &geom.normals {
            ["nx", "ny", "nz"].iter().for_each(|key| {
                vertex_element.properties.add(PropertyDef::new(
                    key.to_string(),
                    PropertyType::Scalar(ScalarType::Float),
                ));
            });

            normals.iter().zip(vertex_array.iter_mut()).for_each(|(normal, elem)| {
                elem.insert("nx".to_string(), Property::Float(normal[0]));
                elem.insert("ny".to_string(), Property::Float(normal[1]));
                elem.insert("nz".to_string(), Property::Float(normal[2]));
            });
        }

        if let Some(colors) = &geom.colors {
            ["red", "green", "blue"].iter().for_each(|key| {
                vertex_element.properties.add(PropertyDef::new(
                    key.to_string(),
                    PropertyType::Scalar(ScalarType::UChar),
                ));
            });

            colors.iter().zip(vertex_array.iter_mut()).for_each(|(color, elem)| {
                elem.insert("red".to_string(), Property::UChar(color[0]));
                elem.insert("green".to_string(), Property::UChar(color[1]));
                elem.insert("blue".to_string(), Property::UChar(color[2]));
            });
        }

        ply.header.elements.add(vertex_element);
        ply.payload.insert("vertex".to_string(), vertex_array);

        ply.make_consistent()
            .map_err(|err| Error::format(format!("Inconsistent PLY: {err:?}")))?;
        ply
    };

    ply.header.encoding = Encoding::Ascii;

    let mut buf = BufWriter::new(File::create(filepath)?);
    Writer::new().write_ply(&mut buf, &mut ply)?;

    Ok(())
}

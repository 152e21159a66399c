// Record Merger - Field-Wise Fold Of Pass Partials
//
// Merge rules, applied recursively per leaf:
// - scalar: a later non-null value replaces the accumulated value, null never erases
// - sequence: concatenation in encounter order, duplicates dropped
// - nested group: merged field by field
// - opaque map: key-wise, later value wins per key

use crate::record::{
    Camera, Colors, Construction, ConstructionSection, EnvironmentLighting, Fabric, Footwear,
    Garment, GarmentComponents, ModelPresentation, OpaqueMap, Pattern, Record,
};
use tracing::{trace, Level};

/// Field-wise merge of a later observation into an accumulator
pub trait Merge {
    fn merge_from(&mut self, later: Self);
}

impl Merge for String {
    fn merge_from(&mut self, later: Self) {
        *self = later;
    }
}

impl<T: Merge> Merge for Option<T> {
    fn merge_from(&mut self, later: Self) {
        let Some(later) = later else {
            return;
        };
        match self {
            Some(current) => current.merge_from(later),
            None => *self = Some(later),
        }
    }
}

impl<T: PartialEq> Merge for Vec<T> {
    fn merge_from(&mut self, later: Self) {
        for item in later {
            if !self.contains(&item) {
                self.push(item);
            }
        }
    }
}

impl Merge for OpaqueMap {
    fn merge_from(&mut self, later: Self) {
        for (key, value) in later {
            self.insert(key, value);
        }
    }
}

/// Derive `Merge` for a group struct by merging each named field
macro_rules! merge_fields {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl Merge for $ty {
            fn merge_from(&mut self, later: Self) {
                $( self.$field.merge_from(later.$field); )+
            }
        }
    };
}

merge_fields!(Fabric { kind, texture, weight, finish });
merge_fields!(Garment { top, bottom });
merge_fields!(GarmentComponents { top_length, bottom_length, layers });
merge_fields!(Pattern { kind, foreground, background });
merge_fields!(Colors { primary, secondary, pattern });
merge_fields!(ConstructionSection { seams, stitching, stitching_color, hems, closure });
merge_fields!(Construction { seams, stitching, stitching_color, hems, closure, top, bottom });
merge_fields!(ModelPresentation { framing, expression, gaze });
merge_fields!(Camera { view, multiview, views, angle });
merge_fields!(EnvironmentLighting { setup, mood, background });
merge_fields!(Footwear { kind, color });

impl Merge for Record {
    fn merge_from(&mut self, later: Self) {
        if self.image_id.is_empty() {
            self.image_id = later.image_id;
        }
        self.source_hash.merge_from(later.source_hash);
        self.version.merge_from(later.version);
        self.garment_type.merge_from(later.garment_type);
        self.silhouette.merge_from(later.silhouette);
        self.fit_and_drape.merge_from(later.fit_and_drape);
        self.fabric.merge_from(later.fabric);
        self.garment.merge_from(later.garment);
        self.garment_components.merge_from(later.garment_components);
        self.colors.merge_from(later.colors);
        self.color_palette.merge_from(later.color_palette);
        self.construction.merge_from(later.construction);
        self.pose.merge_from(later.pose);
        self.photo_style.merge_from(later.photo_style);
        self.model.merge_from(later.model);
        self.camera.merge_from(later.camera);
        self.environment_lighting.merge_from(later.environment_lighting);
        self.footwear.merge_from(later.footwear);
        self.details.merge_from(later.details);
        self.prompt_text.merge_from(later.prompt_text);
        self.confidence.merge_from(later.confidence);
        self.photo_metrics.merge_from(later.photo_metrics);
    }
}

/// Fold one partial into the accumulator
///
/// The accumulator's `image_id` is kept unless it is empty.
pub fn merge(mut acc: Record, partial: Record) -> Record {
    // Field counts serialize the record, so only take them when tracing
    let before = tracing::enabled!(Level::TRACE).then(|| acc.observed_fields());
    acc.merge_from(partial);
    if let Some(before) = before {
        trace!(
            image_id = %acc.image_id,
            before,
            after = acc.observed_fields(),
            "Merged partial"
        );
    }
    acc
}

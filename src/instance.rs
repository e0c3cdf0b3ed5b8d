use crate::error::SyncError;
use crate::localize::localize;
use crate::model::{Advert, AdvertInstance, Location};

/// Copy the template for one location, aligning its validity windows to the
/// location's wall clock.
///
/// The template is never mutated; every call returns an independent value, so
/// one advert can fan out to any number of locations. Fields other than the
/// windows are carried over verbatim.
pub fn build_instance(
    template: &Advert,
    location: &Location,
) -> Result<AdvertInstance, SyncError> {
    let mut advert = template.clone();

    // An advert should be valid for issuing and redemption at the same
    // hour:minute everywhere, e.g. [8:00 Sydney, 8:00 Tokyo] rather than
    // [8:00 Sydney, 7:00 Tokyo].
    if let (Some(start), Some(end)) = (advert.start_date, advert.end_date) {
        advert.start_date = Some(localize(start, &location.timezone)?);
        advert.end_date = Some(localize(end, &location.timezone)?);
    }

    if let Some(voucher) = advert.voucher.as_mut() {
        if let Some(start) = voucher.start_date {
            voucher.start_date = Some(localize(start, &location.timezone)?);
        }
        if let Some(end) = voucher.end_date {
            voucher.end_date = Some(localize(end, &location.timezone)?);
        }
    }

    Ok(AdvertInstance {
        advert_id: template.id,
        location_id: location.id,
        advert,
        location: location.clone(),
    })
}

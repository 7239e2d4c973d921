use crate::net::{Net, Place, Transition};
use crate::synthesis::region::RegionLike;

/// One place `p<i>` per region, one transition per event label.
pub fn construct_net<R: RegionLike>(events: &[String], regions: &[R]) -> Net {
    let mut net = Net::empty();
    let transitions: Vec<_> = events
        .iter()
        .map(|label| net.add_transition(Transition::new(label.clone())))
        .collect();
    for (idx, region) in regions.iter().enumerate() {
        let place = net.add_place(Place::new(format!("p{idx}"), region.initial_marking()));
        for (event, &transition) in transitions.iter().enumerate() {
            net.add_input_arc(place, transition, region.backward_weight(event));
            net.add_output_arc(place, transition, region.forward_weight(event));
        }
    }
    net
}

/// Like [`construct_net`], taking the events from the regions' utility.
/// No regions give the empty net.
pub fn net_from_regions<R: RegionLike>(regions: &[R]) -> Net {
    match regions.first() {
        Some(region) => construct_net(&region.utility().event_list(), regions),
        None => Net::empty(),
    }
}

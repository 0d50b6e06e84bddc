#![allow(non_snake_case)]

use crate::config::{PortMode, SwitchConfig};
use crate::error::SwitchError;
use crate::network::device::{
    stp::{BridgeStatus, StpState},
    switch::{Switch, TrunkPolicy},
    Egress,
};
use crate::network::ethernet::{
    bpdu::Bpdu,
    ethernet_frame,
    vlan::{build_vlan_tag, insert_tag, strip_tag},
    MacAddress,
};
use crate::{bridge_id, eth_data, mac_addr};

const HOST_A: MacAddress = MacAddress([0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0x01]);
const HOST_B: MacAddress = MacAddress([0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0x02]);
const HOST_C: MacAddress = MacAddress([0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0x03]);

fn switch(ports: Vec<PortMode>) -> Switch {
    Switch::new(&SwitchConfig { priority: 10, ports }, mac_addr!(0x10))
}

/// Port 0 = access VLAN 10, port 1 = access VLAN 10, port 2 = trunk.
fn scenario_switch() -> Switch {
    switch(vec![PortMode::Access(10), PortMode::Access(10), PortMode::Trunk])
}

fn ports_of(egress: &[Egress]) -> Vec<usize> {
    egress.iter().map(|e| e.port).collect()
}

#[test]
fn HandleFrame_BroadcastOnAccess_UntaggedToAccessTaggedToTrunk() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));

    // Act
    let egress = switch.handle_frame(0, &frame).unwrap();

    // Assert
    assert_eq!(
        egress,
        vec![
            Egress::new(1, frame.clone()),
            Egress::new(2, insert_tag(&frame, 10).unwrap()),
        ]
    );
    assert_eq!(egress[1].frame.len(), frame.len() + 4);
    assert_eq!(switch.table().lookup(&HOST_A), Some(0));
}

#[test]
fn HandleFrame_ReplyToLearnedAddress_UnicastOnly() {
    // Arrange
    let mut switch = scenario_switch();
    let broadcast = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));
    switch.handle_frame(0, &broadcast).unwrap();
    let reply = ethernet_frame(HOST_A, HOST_B, 0x0800, &eth_data!(2));

    // Act
    let egress = switch.handle_frame(1, &reply).unwrap();

    // Assert
    assert_eq!(egress, vec![Egress::new(0, reply)]);
}

#[test]
fn HandleFrame_UnknownUnicast_Floods() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(HOST_C, HOST_A, 0x0800, &eth_data!(1));

    // Act
    let egress = switch.handle_frame(0, &frame).unwrap();

    // Assert
    assert_eq!(ports_of(&egress), vec![1, 2]);
}

#[test]
fn HandleFrame_DestinationLearnedOnIngress_NothingSent() {
    // Arrange
    let mut switch = scenario_switch();
    switch
        .handle_frame(0, &ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1)))
        .unwrap();

    // Act
    let egress = switch
        .handle_frame(0, &ethernet_frame(HOST_A, HOST_B, 0x0800, &eth_data!(1)))
        .unwrap();

    // Assert
    assert!(egress.is_empty());
    assert_eq!(switch.table().lookup(&HOST_B), Some(0));
}

#[test]
fn HandleFrame_Runt_MalformedAndNextFrameProcessed() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));

    // Act
    let runt = switch.handle_frame(0, &[0xAA; 6]);
    let next = switch.handle_frame(0, &frame);

    // Assert
    match runt {
        Err(e) => assert!(e.is_recoverable()),
        Ok(_) => panic!("Expected a malformed frame error"),
    }
    assert_eq!(ports_of(&next.unwrap()), vec![1, 2]);
    assert_eq!(switch.table().len(), 1);
}

#[test]
fn HandleFrame_PortOutOfRange_UnknownPort() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));

    // Act
    let result = switch.handle_frame(3, &frame);

    // Assert
    assert!(matches!(result, Err(SwitchError::UnknownPort(3))));
    assert!(switch.table().is_empty());
}

#[test]
fn HandleFrame_AccessVlans_NeverLeakAcrossVlans() {
    // Arrange
    let mut switch = switch(vec![
        PortMode::Access(10),
        PortMode::Access(20),
        PortMode::Access(10),
        PortMode::Trunk,
        PortMode::Access(20),
    ]);
    let from_10 = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));
    let from_20 = ethernet_frame(MacAddress::BROADCAST, HOST_B, 0x0800, &eth_data!(2));

    // Act
    let egress_10 = switch.handle_frame(0, &from_10).unwrap();
    let egress_20 = switch.handle_frame(1, &from_20).unwrap();

    // Assert
    assert_eq!(ports_of(&egress_10), vec![2, 3]);
    assert_eq!(egress_10[1].frame[12..16], build_vlan_tag(10));
    assert_eq!(ports_of(&egress_20), vec![3, 4]);
    assert_eq!(egress_20[0].frame[12..16], build_vlan_tag(20));
}

#[test]
fn HandleFrame_KnownDestinationInOtherVlan_NotDelivered() {
    // Arrange
    let mut switch = switch(vec![PortMode::Access(10), PortMode::Access(20)]);
    switch
        .handle_frame(1, &ethernet_frame(MacAddress::BROADCAST, HOST_B, 0x0800, &eth_data!(1)))
        .unwrap();

    // Act
    let egress = switch
        .handle_frame(0, &ethernet_frame(HOST_B, HOST_A, 0x0800, &eth_data!(1)))
        .unwrap();

    // Assert
    assert!(egress.is_empty());
}

#[test]
fn HandleFrame_TaggedOnTrunk_StrippedToMatchingAccessOnly() {
    // Arrange
    let mut switch = switch(vec![PortMode::Access(10), PortMode::Access(20), PortMode::Trunk]);
    let untagged = ethernet_frame(MacAddress::BROADCAST, HOST_C, 0x0800, &eth_data!(3));
    let tagged = insert_tag(&untagged, 20).unwrap();

    // Act
    let egress = switch.handle_frame(2, &tagged).unwrap();

    // Assert
    assert_eq!(egress, vec![Egress::new(1, untagged)]);
    assert_eq!(switch.table().lookup(&HOST_C), Some(2));
}

#[test]
fn HandleFrame_TaggedOnAccess_Dropped() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));
    let tagged = insert_tag(&frame, 10).unwrap();

    // Act
    let egress = switch.handle_frame(0, &tagged).unwrap();

    // Assert
    assert!(egress.is_empty());
    assert!(switch.table().is_empty());
}

#[test]
fn HandleFrame_UntaggedOnTrunk_Dropped() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));

    // Act
    let egress = switch.handle_frame(2, &frame).unwrap();

    // Assert
    assert!(egress.is_empty());
}

#[test]
fn HandleFrame_GroupSourceAddress_Dropped() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(HOST_A, MacAddress::BROADCAST, 0x0800, &eth_data!(1));

    // Act
    let egress = switch.handle_frame(0, &frame).unwrap();

    // Assert
    assert!(egress.is_empty());
    assert!(switch.table().is_empty());
}

fn trunk_to_trunk(policy: TrunkPolicy) -> (Vec<u8>, Vec<Egress>) {
    let mut switch = switch(vec![PortMode::Access(10), PortMode::Trunk, PortMode::Trunk])
        .with_trunk_policy(policy);
    let untagged = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));
    let mut tagged = insert_tag(&untagged, 10).unwrap();
    tagged[14] |= 0x60; // priority bits

    let egress = switch.handle_frame(1, &tagged).unwrap();
    (tagged, egress)
}

#[test]
fn HandleFrame_TrunkToTrunkPreserve_ExistingTagUntouched() {
    // Act
    let (tagged, egress) = trunk_to_trunk(TrunkPolicy::Preserve);

    // Assert
    assert_eq!(ports_of(&egress), vec![0, 2]);
    assert_eq!(egress[1].frame, tagged);
}

#[test]
fn HandleFrame_TrunkToTrunkRewrite_TagReplaced() {
    // Act
    let (tagged, egress) = trunk_to_trunk(TrunkPolicy::Rewrite);

    // Assert
    assert_eq!(egress[1].frame.len(), tagged.len());
    assert_eq!(egress[1].frame[12..16], build_vlan_tag(10));
    assert_eq!(egress[0].frame, strip_tag(&egress[1].frame).unwrap());
}

#[test]
fn HandleFrame_TrunkToTrunkStack_SecondTagPushed() {
    // Act
    let (tagged, egress) = trunk_to_trunk(TrunkPolicy::Stack);

    // Assert
    assert_eq!(egress[1].frame, insert_tag(&tagged, 10).unwrap());
}

#[test]
fn HandleFrame_TaggingExceedsLimit_DroppedForThatPortOnly() {
    // Arrange
    let mut switch = scenario_switch();
    let frame = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &vec![0x11; 1583]);
    assert_eq!(frame.len(), 1597);

    // Act
    let egress = switch.handle_frame(0, &frame).unwrap();

    // Assert
    assert_eq!(egress, vec![Egress::new(1, frame)]);
}

#[test]
fn HandleFrame_Bpdu_UpdatesBridgeState() {
    // Arrange
    let mut switch = switch(vec![PortMode::Access(10), PortMode::Trunk, PortMode::Trunk]);
    let root = bridge_id!(mac_addr!(0x50), 5);
    let frame = Bpdu::hello(root).to_frame(root.mac);

    // Act
    let egress = switch.handle_frame(2, &frame).unwrap();

    // Assert
    let state = switch.bridge_state();
    assert_eq!(state.root_bridge_id, root);
    assert_eq!(state.root_port, Some(2));
    assert_eq!(switch.status(), BridgeStatus::NonRoot { root_port: 2 });
    assert_eq!(ports_of(&egress), vec![1]);
    assert_eq!(
        switch.spanning_tree().lock().port_state(2),
        Some(StpState::Forwarding)
    );
}

#[test]
fn HandleFrame_BlockingTrunk_NeitherForwardsNorLearns() {
    // Arrange
    let mut switch = switch(vec![PortMode::Access(10), PortMode::Trunk, PortMode::Trunk]);
    let root = bridge_id!(mac_addr!(0x50), 5);
    switch
        .handle_frame(1, &Bpdu::hello(root).to_frame(root.mac))
        .unwrap(); // port 2 is now blocking

    let from_host = ethernet_frame(MacAddress::BROADCAST, HOST_A, 0x0800, &eth_data!(1));
    let from_blocked =
        insert_tag(&ethernet_frame(MacAddress::BROADCAST, HOST_B, 0x0800, &eth_data!(2)), 10)
            .unwrap();

    // Act
    let egress_host = switch.handle_frame(0, &from_host).unwrap();
    let egress_blocked = switch.handle_frame(2, &from_blocked).unwrap();

    // Assert
    assert_eq!(ports_of(&egress_host), vec![1]);
    assert!(egress_blocked.is_empty());
    assert_eq!(switch.table().lookup(&HOST_B), None);
}

#[test]
fn Hello_Root_OnlyTrunkPorts() {
    // Arrange
    let switch = scenario_switch();

    // Act
    let hello = switch.hello();

    // Assert
    assert_eq!(ports_of(&hello), vec![2]);
    assert_eq!(
        Bpdu::from_frame(&hello[0].frame).unwrap(),
        Bpdu::hello(switch.bid())
    );
}
